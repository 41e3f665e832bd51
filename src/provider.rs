//! The data-access provider boundary, plus an in-memory reference provider.

use std::sync::Arc;

use crate::ast::{Expr, Param};
use crate::cursor::RecordSource;
use crate::error::DeferError;
use crate::evaluator::{self, Bindings};
use crate::schema::{Record, RecordSchema};
use crate::value::Value;

/// The backend that executes reduced projections.
///
/// Given the rewritten query expression (whose terminal projection
/// constructs intermediate records), the provider yields those records as a
/// lazy [`RecordSource`]. This is the only operation the engine requires of
/// a backend.
pub trait QueryProvider {
    fn execute(
        &self,
        expression: &Expr,
        schema: &Arc<RecordSchema>,
    ) -> Result<Box<dyn RecordSource>, DeferError>;
}

/// In-memory provider evaluating queries over a vector of rows.
///
/// Interprets `Source`, `Where` chains and the terminal record-constructing
/// `Select`; rows are filtered and projected one at a time as the source is
/// advanced. Evaluation failures surface as [`DeferError::Provider`].
pub struct MemoryProvider {
    rows: Vec<Value>,
}

impl MemoryProvider {
    pub fn new(rows: Vec<Value>) -> MemoryProvider {
        MemoryProvider { rows }
    }
}

impl QueryProvider for MemoryProvider {
    fn execute(
        &self,
        expression: &Expr,
        schema: &Arc<RecordSchema>,
    ) -> Result<Box<dyn RecordSource>, DeferError> {
        let plan = QueryPlan::from_expression(expression);
        Ok(Box::new(MemoryRecordSource {
            rows: self.rows.clone(),
            position: 0,
            plan,
            schema: schema.clone(),
        }))
    }
}

/// The operator chain of a reduced expression, unpacked for row-at-a-time
/// evaluation.
struct QueryPlan {
    /// Filter predicates, outermost `Where` last
    filters: Vec<(Param, Expr)>,
    projection_parameter: Param,
    projection_fields: Vec<Expr>,
}

impl QueryPlan {
    /// Unpacks `Select(Where*(Source))`. Reduced expressions come from the
    /// transformer, so any other shape is a contract violation rather than a
    /// runtime condition.
    fn from_expression(expression: &Expr) -> QueryPlan {
        let (source, projection) = match expression {
            Expr::Select { source, projection } => (source, projection),
            other => panic!(
                "memory provider expects a terminal projection, got {:?}",
                other
            ),
        };

        let (projection_parameter, projection_fields) = match projection.as_ref() {
            Expr::Lambda { params, body } if params.len() == 1 => match body.as_ref() {
                Expr::NewRecord { fields, .. } => (params[0].clone(), fields.clone()),
                other => panic!(
                    "memory provider expects a record-constructing projection, got {:?}",
                    other
                ),
            },
            other => panic!("memory provider expects a unary lambda, got {:?}", other),
        };

        let mut filters = Vec::new();
        let mut current = source.as_ref();
        loop {
            match current {
                Expr::Where { source, predicate } => {
                    match predicate.as_ref() {
                        Expr::Lambda { params, body } if params.len() == 1 => {
                            filters.push((params[0].clone(), body.as_ref().clone()));
                        }
                        other => panic!(
                            "memory provider expects a unary predicate lambda, got {:?}",
                            other
                        ),
                    }
                    current = source.as_ref();
                }
                Expr::Source => break,
                other => panic!(
                    "memory provider expects a Where chain over Source, got {:?}",
                    other
                ),
            }
        }
        // Collected outermost-first; apply innermost-first
        filters.reverse();

        QueryPlan {
            filters,
            projection_parameter,
            projection_fields,
        }
    }

    fn matches(&self, row: &Value) -> Result<bool, DeferError> {
        for (param, predicate) in &self.filters {
            let bindings = Bindings::new().with(param.name.clone(), row.clone());
            let verdict = evaluator::eval(predicate, &bindings).map_err(DeferError::Provider)?;
            if !verdict.as_bool() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn project(&self, row: &Value, schema: &Arc<RecordSchema>) -> Result<Record, DeferError> {
        let bindings = Bindings::new().with(self.projection_parameter.name.clone(), row.clone());

        let mut fields = Vec::with_capacity(self.projection_fields.len());
        for field in &self.projection_fields {
            fields.push(evaluator::eval(field, &bindings).map_err(DeferError::Provider)?);
        }
        Ok(Record::new(schema.clone(), fields))
    }
}

struct MemoryRecordSource {
    rows: Vec<Value>,
    position: usize,
    plan: QueryPlan,
    schema: Arc<RecordSchema>,
}

impl RecordSource for MemoryRecordSource {
    fn advance(&mut self) -> Result<Option<Record>, DeferError> {
        while self.position < self.rows.len() {
            let row = self.rows[self.position].clone();
            self.position += 1;

            if !self.plan.matches(&row)? {
                continue;
            }
            return Ok(Some(self.plan.project(&row, &self.schema)?));
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), DeferError> {
        self.position = 0;
        Ok(())
    }
}
