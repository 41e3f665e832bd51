use std::sync::Arc;

use crate::ast::{BinOp, Param};
use crate::schema::RecordSchema;
use crate::value::{Value, ValueType};

/// A node of a query expression tree.
///
/// Nodes are immutable; the transformer rewrites trees by producing new
/// nodes rather than mutating existing ones. Data-access nodes whose result
/// type cannot be inferred (`Field`, `Method`) carry a declared type, the
/// way a typed row schema would.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Constant(Value),

    /// Reference to a declared parameter
    ///
    /// Either the terminal projection's source-item parameter or a
    /// placeholder synthesized by the transformer.
    Parameter(Param),

    /// Member/field access on a receiver
    ///
    /// # Example
    /// ```text
    /// person.field("last_name", String)
    /// ```
    Field {
        object: Box<Expr>,
        name: String,
        ty: ValueType,
    },

    /// Non-static method call on a receiver
    ///
    /// The receiver ties the call to the data it operates on; arguments are
    /// classified independently of the receiver.
    ///
    /// # Example
    /// ```text
    /// person.field("last_name", String).method("upper", [], String)
    /// ```
    Method {
        object: Box<Expr>,
        name: String,
        args: Vec<Expr>,
        ty: ValueType,
    },

    /// Free-standing function invocation with no receiver
    ///
    /// # Example
    /// ```text
    /// format("{0}, {1}", last, first)
    /// ```
    Invoke { function: String, args: Vec<Expr> },

    /// Binary operation (arithmetic, comparison, logical, indexing)
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Conversion of the operand to another value type
    Convert { operand: Box<Expr>, ty: ValueType },

    /// Function value with declared parameters
    Lambda { params: Vec<Param>, body: Box<Expr> },

    /// The provider's root collection
    Source,

    /// Terminal projection operator: maps each source item through a lambda
    ///
    /// The single operation the defer engine rewrites. Must be the outermost
    /// operation of the query.
    Select {
        source: Box<Expr>,
        projection: Box<Expr>,
    },

    /// Filter operator: keeps source items matching a predicate lambda
    Where {
        source: Box<Expr>,
        predicate: Box<Expr>,
    },

    /// Constructs an intermediate record from field expressions
    ///
    /// Appears only in reduced projections built by the transformer; the
    /// provider evaluates each field expression and packs the results.
    NewRecord {
        schema: Arc<RecordSchema>,
        fields: Vec<Expr>,
    },
}

impl Expr {
    pub fn constant(value: Value) -> Expr {
        Expr::Constant(value)
    }

    pub fn field(self, name: impl Into<String>, ty: ValueType) -> Expr {
        Expr::Field {
            object: Box::new(self),
            name: name.into(),
            ty,
        }
    }

    pub fn method(self, name: impl Into<String>, args: Vec<Expr>, ty: ValueType) -> Expr {
        Expr::Method {
            object: Box::new(self),
            name: name.into(),
            args,
            ty,
        }
    }

    pub fn invoke(function: impl Into<String>, args: Vec<Expr>) -> Expr {
        Expr::Invoke {
            function: function.into(),
            args,
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(self, index: Expr) -> Expr {
        Expr::binary(BinOp::Index, self, index)
    }

    pub fn convert(self, ty: ValueType) -> Expr {
        Expr::Convert {
            operand: Box::new(self),
            ty,
        }
    }

    pub fn lambda(params: Vec<Param>, body: Expr) -> Expr {
        Expr::Lambda {
            params,
            body: Box::new(body),
        }
    }

    /// Chain a terminal projection onto this query expression.
    pub fn select(self, param: Param, body: Expr) -> Expr {
        Expr::Select {
            source: Box::new(self),
            projection: Box::new(Expr::lambda(vec![param], body)),
        }
    }

    /// Chain a filter onto this query expression.
    pub fn filter(self, param: Param, predicate: Expr) -> Expr {
        Expr::Where {
            source: Box::new(self),
            predicate: Box::new(Expr::lambda(vec![param], predicate)),
        }
    }

    /// The static value type this expression produces.
    ///
    /// Declared on data-access nodes, inferred elsewhere. Best-effort for
    /// shapes that are never delegated (unknown invocations report `Null`).
    pub fn value_type(&self) -> ValueType {
        match self {
            Expr::Constant(value) => value.value_type(),
            Expr::Parameter(param) => param.ty.clone(),
            Expr::Field { ty, .. } => ty.clone(),
            Expr::Method { ty, .. } => ty.clone(),
            Expr::Convert { ty, .. } => ty.clone(),
            Expr::Invoke { function, .. } => match function.as_str() {
                "format" | "upper" | "lower" | "concat" => ValueType::String,
                _ => ValueType::Null,
            },
            Expr::Binary { op, left, right } => match op {
                BinOp::Equal
                | BinOp::NotEqual
                | BinOp::LessThan
                | BinOp::GreaterThan
                | BinOp::LessEqual
                | BinOp::GreaterEqual
                | BinOp::And
                | BinOp::Or => ValueType::Boolean,
                BinOp::Index => match left.value_type() {
                    ValueType::Array(element) => *element,
                    _ => ValueType::Null,
                },
                BinOp::Add
                | BinOp::Subtract
                | BinOp::Multiply
                | BinOp::Divide
                | BinOp::Modulo => arithmetic_type(op, &left.value_type(), &right.value_type()),
            },
            Expr::Lambda { body, .. } => body.value_type(),
            Expr::Source => ValueType::Array(Box::new(ValueType::Object)),
            Expr::Select { projection, .. } => {
                ValueType::Array(Box::new(projection.value_type()))
            }
            Expr::Where { source, .. } => source.value_type(),
            Expr::NewRecord { .. } => ValueType::Object,
        }
    }
}

fn arithmetic_type(op: &BinOp, left: &ValueType, right: &ValueType) -> ValueType {
    match (left, right) {
        (ValueType::String, _) | (_, ValueType::String) if *op == BinOp::Add => ValueType::String,
        (ValueType::Integer, ValueType::Integer) => ValueType::Integer,
        (ValueType::Integer, ValueType::Float)
        | (ValueType::Float, ValueType::Integer)
        | (ValueType::Float, ValueType::Float) => ValueType::Float,
        _ => ValueType::Null,
    }
}
