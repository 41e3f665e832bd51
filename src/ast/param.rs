use crate::ast::Expr;
use crate::value::ValueType;

/// A declared parameter of a lambda.
///
/// The terminal projection's lambda declares the source-item parameter; the
/// transformer additionally synthesizes placeholder parameters
/// (`source_expr_0`, `source_expr_1`, ...) that stand in for delegated
/// sub-expressions inside the reconstruction lambda.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name; unique within the enclosing lambda
    pub name: String,

    /// Declared value type of the parameter
    pub ty: ValueType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Param {
        Param {
            name: name.into(),
            ty,
        }
    }

    /// An expression referring to this parameter.
    pub fn to_expr(&self) -> Expr {
        Expr::Parameter(self.clone())
    }
}
