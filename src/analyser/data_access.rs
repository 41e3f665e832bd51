use std::collections::HashMap;

use crate::analyser::{ExpressionAnalyser, NodePath};
use crate::ast::{BinOp, Expr, Param};

/// The reference analyser: approves plain data retrieval only.
///
/// The provider is asked to retrieve the source item itself, a field of it,
/// a method call on it, an index into it, or some combination of those
/// operations. Everything else (arithmetic over retrieved values, free
/// functions, constants) is deferred for local post-processing.
pub struct DataAccessOnlyAnalyser {
    /// Per-node verdicts for this pass, keyed by node identity. The same
    /// sub-expression is asked about from multiple ancestor contexts.
    validity: HashMap<usize, bool>,
    source_parameter: Option<Param>,
}

impl DataAccessOnlyAnalyser {
    pub fn new() -> DataAccessOnlyAnalyser {
        DataAccessOnlyAnalyser {
            validity: HashMap::new(),
            source_parameter: None,
        }
    }

    fn is_source_parameter(&self, expr: &Expr) -> bool {
        match (expr, &self.source_parameter) {
            (Expr::Parameter(param), Some(source)) => param == source,
            _ => false,
        }
    }

    fn is_field_access(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Field { object, .. } => self.is_data_access(object),
            _ => false,
        }
    }

    fn is_object_method_call(&mut self, expr: &Expr) -> bool {
        match expr {
            // Arguments are not required to be data access; they are
            // classified independently when visited.
            Expr::Method { object, .. } => self.is_data_access(object),
            _ => false,
        }
    }

    fn is_array_index(&mut self, expr: &Expr) -> bool {
        match expr {
            Expr::Binary {
                op: BinOp::Index,
                left,
                right,
            } => {
                self.is_data_access(left)
                    && (self.is_data_access(right) || matches!(right.as_ref(), Expr::Constant(_)))
            }
            _ => false,
        }
    }

    fn is_data_access(&mut self, expr: &Expr) -> bool {
        let key = expr as *const Expr as usize;
        if let Some(&known) = self.validity.get(&key) {
            return known;
        }

        let verdict = self.is_source_parameter(expr)
            || self.is_field_access(expr)
            || self.is_object_method_call(expr)
            || self.is_array_index(expr);

        self.validity.insert(key, verdict);
        verdict
    }
}

impl Default for DataAccessOnlyAnalyser {
    fn default() -> Self {
        DataAccessOnlyAnalyser::new()
    }
}

impl ExpressionAnalyser for DataAccessOnlyAnalyser {
    fn initialise(&mut self, source_parameter: &Param) {
        assert!(
            self.source_parameter.is_none(),
            "analyser initialised twice; create a fresh analyser per pass"
        );
        self.source_parameter = Some(source_parameter.clone());
    }

    fn should_delegate(&mut self, path: &NodePath<'_>) -> bool {
        match path.current() {
            Some(node) => self.is_data_access(node.expr()),
            None => false,
        }
    }
}
