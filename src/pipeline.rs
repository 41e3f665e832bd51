//! Wiring: configuration, the wrapped query, and the entry points.
//!
//! A [`WrappedQuery`] holds the untransformed expression so ordinary query
//! composition keeps working; nothing runs until enumeration. On
//! [`iter`](WrappedQuery::iter) the expression is transformed, the reduced
//! projection handed to the provider, and the resulting record source
//! wrapped in a [`PostProcessCursor`].

use std::rc::Rc;
use std::sync::Arc;

use crate::analyser::{DataAccessOnlyAnalyser, ExpressionAnalyser};
use crate::ast::{Expr, Param};
use crate::cursor::PostProcessCursor;
use crate::error::DeferError;
use crate::provider::QueryProvider;
use crate::schema::SchemaRegistry;
use crate::transform::transform;
use crate::value::Value;

/// Immutable configuration for deferred evaluation.
///
/// Holds the factory producing a fresh analyser per transformation pass, so
/// concurrent queries never share analyser state.
#[derive(Clone)]
pub struct DeferConfig {
    analyser_factory: Rc<dyn Fn() -> Box<dyn ExpressionAnalyser>>,
}

impl DeferConfig {
    pub fn new(analyser_factory: impl Fn() -> Box<dyn ExpressionAnalyser> + 'static) -> DeferConfig {
        DeferConfig {
            analyser_factory: Rc::new(analyser_factory),
        }
    }

    /// A fresh analyser for one pass.
    pub fn make_analyser(&self) -> Box<dyn ExpressionAnalyser> {
        (self.analyser_factory)()
    }
}

/// The default configuration uses the [`DataAccessOnlyAnalyser`].
impl Default for DeferConfig {
    fn default() -> DeferConfig {
        DeferConfig::new(|| Box::new(DataAccessOnlyAnalyser::new()))
    }
}

impl std::fmt::Debug for DeferConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferConfig").finish_non_exhaustive()
    }
}

/// A query wrapped for deferred evaluation.
///
/// Holds the untransformed source expression; further operators can be
/// composed before enumerating. Execution is triggered only by
/// [`iter`](WrappedQuery::iter).
pub struct WrappedQuery {
    provider: Arc<dyn QueryProvider>,
    expression: Expr,
    config: DeferConfig,
    registry: Arc<SchemaRegistry>,
}

impl WrappedQuery {
    pub fn new(
        provider: Arc<dyn QueryProvider>,
        expression: Expr,
        config: DeferConfig,
    ) -> WrappedQuery {
        WrappedQuery {
            provider,
            expression,
            config,
            registry: Arc::new(SchemaRegistry::new()),
        }
    }

    /// Shares a schema registry across queries, so equal field-type
    /// signatures resolve to the same schema object pipeline-wide.
    pub fn with_registry(mut self, registry: Arc<SchemaRegistry>) -> WrappedQuery {
        self.registry = registry;
        self
    }

    /// The untransformed source expression.
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Composes a further filter onto the wrapped query.
    pub fn filter(&self, param: Param, predicate: Expr) -> WrappedQuery {
        self.compose(|expr| expr.filter(param, predicate))
    }

    /// Composes a further projection onto the wrapped query.
    pub fn select(&self, param: Param, body: Expr) -> WrappedQuery {
        self.compose(|expr| expr.select(param, body))
    }

    fn compose(&self, extend: impl FnOnce(Expr) -> Expr) -> WrappedQuery {
        WrappedQuery {
            provider: self.provider.clone(),
            expression: extend(self.expression.clone()),
            config: self.config.clone(),
            registry: self.registry.clone(),
        }
    }

    /// Enumerates the query: transform, delegate to the provider, and wrap
    /// the intermediate records for lazy post-processing.
    pub fn iter(&self) -> Result<PostProcessCursor, DeferError> {
        let transformation =
            transform(&self.expression, &self.registry, &|| self.config.make_analyser())?;

        let records = self
            .provider
            .execute(&transformation.reduced_expression, &transformation.schema)?;

        Ok(PostProcessCursor::new(
            records,
            transformation.post_process_fn(),
        ))
    }

    /// Scalar execution is not supported on a wrapped query.
    ///
    /// Materialise through [`execute_deferred`] first, then count the result.
    pub fn count(&self) -> Result<usize, DeferError> {
        Err(DeferError::Unsupported(
            "wrapped queries do not support scalar execution; materialise with execute_deferred \
             and operate on the result"
                .to_string(),
        ))
    }
}

/// Wraps a query for deferred evaluation without forcing materialisation.
///
/// The lower-level entry point, for callers who want to compose further
/// operators before enumerating.
pub fn wrap(
    provider: Arc<dyn QueryProvider>,
    expression: Expr,
    config: DeferConfig,
) -> WrappedQuery {
    WrappedQuery::new(provider, expression, config)
}

/// Transforms the query, delegates the reduced projection to the provider,
/// post-processes each record, and collects the results in order.
///
/// The one call most collaborators need. With no configuration supplied the
/// default (data-access-only) classification is used.
pub fn execute_deferred(
    provider: Arc<dyn QueryProvider>,
    expression: Expr,
    config: Option<DeferConfig>,
) -> Result<Vec<Value>, DeferError> {
    let config = config.unwrap_or_default();
    let query = wrap(provider, expression, config);

    let mut cursor = query.iter()?;
    let mut results = Vec::new();
    while cursor.advance()? {
        results.push(cursor.current()?.clone());
    }
    cursor.release();

    Ok(results)
}
