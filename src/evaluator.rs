use std::collections::HashMap;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::ast::{BinOp, Expr};
use crate::value::{Value, ValueType};

/// Parameter bindings in scope while evaluating one expression.
///
/// The post-process function binds each placeholder parameter to the
/// matching intermediate-record field; the in-memory provider binds the
/// projection parameter to the current row.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Bindings {
        Bindings {
            values: HashMap::new(),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`bind`](Bindings::bind).
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Bindings {
        self.bind(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Errors that can occur during expression evaluation.
#[derive(Debug, Clone)]
pub enum EvalError {
    /// Type mismatch or invalid operation for the given type
    TypeError(String),

    /// Invalid field access or array index
    AccessError(String),

    /// Reference to a parameter with no binding in scope
    UnboundParameter(String),

    /// Call to an unknown free function
    UnknownFunction(String),

    /// Call to an unknown method
    UnknownMethod(String),

    /// Division by zero
    DivisionByZero,
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeError(msg) => write!(f, "Type error: {}", msg),
            EvalError::AccessError(msg) => write!(f, "Access error: {}", msg),
            EvalError::UnboundParameter(name) => {
                write!(f, "Unbound parameter: {} has no value in scope", name)
            }
            EvalError::UnknownFunction(name) => write!(f, "Unknown function: {}", name),
            EvalError::UnknownMethod(name) => write!(f, "Unknown method: .{}()", name),
            EvalError::DivisionByZero => write!(f, "Division by zero"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Returns a human-readable type name for a Value
fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Evaluates a scalar expression against the given parameter bindings.
///
/// Query operators (`Source`, `Select`, `Where`) and record construction are
/// not scalar expressions; they are interpreted by providers, not here.
pub fn eval(expr: &Expr, bindings: &Bindings) -> Result<Value, EvalError> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),

        Expr::Parameter(param) => bindings
            .get(&param.name)
            .cloned()
            .ok_or_else(|| EvalError::UnboundParameter(param.name.clone())),

        Expr::Field { object, name, .. } => {
            let object = eval(object, bindings)?;
            access_field(&object, name)
        }

        Expr::Binary { op, left, right } => {
            let left = eval(left, bindings)?;
            let right = eval(right, bindings)?;
            apply_binop(*op, &left, &right)
        }

        Expr::Method {
            object, name, args, ..
        } => {
            let object = eval(object, bindings)?;
            let args = eval_args(args, bindings)?;
            eval_method(&object, name, &args)
        }

        Expr::Invoke { function, args } => {
            let args = eval_args(args, bindings)?;
            eval_function(function, &args)
        }

        Expr::Convert { operand, ty } => {
            let value = eval(operand, bindings)?;
            convert_value(value, ty)
        }

        Expr::Lambda { .. } => Err(EvalError::TypeError(
            "function value cannot be evaluated as a scalar".to_string(),
        )),

        Expr::Source | Expr::Select { .. } | Expr::Where { .. } => Err(EvalError::TypeError(
            "query operator cannot be evaluated outside a provider".to_string(),
        )),

        Expr::NewRecord { .. } => Err(EvalError::TypeError(
            "record construction is only valid inside a reduced projection".to_string(),
        )),
    }
}

fn eval_args(args: &[Expr], bindings: &Bindings) -> Result<Vec<Value>, EvalError> {
    args.iter().map(|arg| eval(arg, bindings)).collect()
}

fn access_field(object: &Value, name: &str) -> Result<Value, EvalError> {
    match object {
        // Missing fields read as null rather than failing; rows are not
        // required to be uniform.
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        other => Err(EvalError::AccessError(format!(
            "cannot access field '{}' on {}",
            name,
            type_name(other)
        ))),
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
            apply_arithmetic(op, left, right)
        }

        BinOp::Equal => Ok(Value::Boolean(left == right)),
        BinOp::NotEqual => Ok(Value::Boolean(left != right)),

        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            apply_comparison(op, left, right)
        }

        BinOp::And => Ok(Value::Boolean(left.as_bool() && right.as_bool())),
        BinOp::Or => Ok(Value::Boolean(left.as_bool() || right.as_bool())),

        BinOp::Index => apply_index(left, right),
    }
}

fn apply_arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::String(a), Value::String(b)) if op == BinOp::Add => {
            Ok(Value::String(format!("{}{}", a, b)))
        }

        (Value::Integer(a), Value::Integer(b)) => match op {
            BinOp::Add => Ok(Value::Integer(a + b)),
            BinOp::Subtract => Ok(Value::Integer(a - b)),
            BinOp::Multiply => Ok(Value::Integer(a * b)),
            BinOp::Divide => {
                if *b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                // Exact division stays an integer; otherwise fall to float
                if *a % *b == 0 {
                    Ok(Value::Integer(a / b))
                } else {
                    Ok(Value::Float(*a as f64 / *b as f64))
                }
            }
            BinOp::Modulo => {
                if *b == 0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(Value::Integer(a % b))
            }
            _ => unreachable!(),
        },

        (Value::Float(a), Value::Float(b)) => apply_float_arithmetic(op, *a, *b),

        // Mixed integer/float: go through high-precision decimals so that
        // whole-number results stay integers.
        (Value::Integer(a), Value::Float(b)) => {
            if let (Some(ad), Some(bd)) = (Decimal::from_i64(*a), Decimal::from_f64(*b))
                && let Some(result) = decimal_arithmetic(op, ad, bd)?
            {
                return Ok(result);
            }
            apply_float_arithmetic(op, *a as f64, *b)
        }
        (Value::Float(a), Value::Integer(b)) => {
            if let (Some(ad), Some(bd)) = (Decimal::from_f64(*a), Decimal::from_i64(*b))
                && let Some(result) = decimal_arithmetic(op, ad, bd)?
            {
                return Ok(result);
            }
            apply_float_arithmetic(op, *a, *b as f64)
        }

        (a, b) => Err(EvalError::TypeError(format!(
            "cannot apply {:?} to {} and {}",
            op,
            type_name(a),
            type_name(b)
        ))),
    }
}

fn apply_float_arithmetic(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinOp::Modulo => {
            if b == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!(),
    };
    Ok(Value::Float(result))
}

fn decimal_arithmetic(op: BinOp, a: Decimal, b: Decimal) -> Result<Option<Value>, EvalError> {
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a / b
        }
        BinOp::Modulo => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!(),
    };

    if result.is_integer()
        && let Some(n) = result.to_i64()
    {
        return Ok(Some(Value::Integer(n)));
    }
    Ok(result.to_f64().map(Value::Float))
}

fn apply_comparison(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (a, b) = match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::TypeError(format!(
                "cannot compare {} and {} (comparison requires numeric types)",
                type_name(left),
                type_name(right)
            )));
        }
    };

    let result = match op {
        BinOp::LessThan => a < b,
        BinOp::GreaterThan => a > b,
        BinOp::LessEqual => a <= b,
        BinOp::GreaterEqual => a >= b,
        _ => unreachable!(),
    };
    Ok(Value::Boolean(result))
}

fn apply_index(indexed: &Value, index: &Value) -> Result<Value, EvalError> {
    match (indexed, index) {
        (Value::Array(arr), Value::Integer(n)) => {
            let index = if *n < 0 {
                // Negative index: count from end (-1 = last)
                let from_end = (-*n) as usize;
                if from_end > arr.len() {
                    return Ok(Value::Null);
                }
                arr.len() - from_end
            } else {
                *n as usize
            };
            Ok(arr.get(index).cloned().unwrap_or(Value::Null))
        }
        (Value::Object(map), Value::String(key)) => {
            Ok(map.get(key).cloned().unwrap_or(Value::Null))
        }
        (indexed, index) => Err(EvalError::AccessError(format!(
            "cannot index {} with {}",
            type_name(indexed),
            type_name(index)
        ))),
    }
}

fn eval_method(object: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "upper" => method_string(object, name, |s| Value::String(s.to_uppercase())),
        "lower" => method_string(object, name, |s| Value::String(s.to_lowercase())),
        "trim" => method_string(object, name, |s| Value::String(s.trim().to_string())),
        "reverse" => method_string(object, name, |s| Value::String(s.chars().rev().collect())),
        "len" => method_len(object),
        "contains" => method_contains(object, args),
        "matches" => method_matches(object, args),
        other => Err(EvalError::UnknownMethod(other.to_string())),
    }
}

fn method_string(
    object: &Value,
    name: &str,
    apply: impl Fn(&str) -> Value,
) -> Result<Value, EvalError> {
    match object {
        Value::String(s) => Ok(apply(s)),
        other => Err(EvalError::TypeError(format!(
            ".{}() requires a string, got {}",
            name,
            type_name(other)
        ))),
    }
}

/// .len() - string length in characters, or element/entry count
fn method_len(object: &Value) -> Result<Value, EvalError> {
    match object {
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        Value::Array(arr) => Ok(Value::Integer(arr.len() as i64)),
        Value::Object(obj) => Ok(Value::Integer(obj.len() as i64)),
        other => Err(EvalError::TypeError(format!(
            ".len() requires a string, array or object, got {}",
            type_name(other)
        ))),
    }
}

/// .contains(needle) - substring test on strings, membership test on arrays
fn method_contains(object: &Value, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::TypeError(
            ".contains() requires exactly one argument".to_string(),
        ));
    }

    match (object, &args[0]) {
        (Value::String(s), Value::String(needle)) => Ok(Value::Boolean(s.contains(needle))),
        (Value::Array(arr), needle) => Ok(Value::Boolean(arr.contains(needle))),
        (object, needle) => Err(EvalError::TypeError(format!(
            "cannot test {} for containment of {}",
            type_name(object),
            type_name(needle)
        ))),
    }
}

/// .matches(pattern) - returns true if string matches regex pattern
fn method_matches(object: &Value, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(EvalError::TypeError(
            ".matches() requires exactly one argument".to_string(),
        ));
    }

    let subject = match object {
        Value::String(s) => s,
        other => {
            return Err(EvalError::TypeError(format!(
                ".matches() requires a string, got {}",
                type_name(other)
            )));
        }
    };
    let pattern = match &args[0] {
        Value::String(p) => p,
        other => {
            return Err(EvalError::TypeError(format!(
                ".matches() argument must be string, got {}",
                type_name(other)
            )));
        }
    };

    let re = regex::Regex::new(pattern)
        .map_err(|e| EvalError::TypeError(format!("invalid regex: {e}")))?;
    Ok(Value::Boolean(re.is_match(subject)))
}

fn eval_function(function: &str, args: &[Value]) -> Result<Value, EvalError> {
    match function {
        "format" => function_format(args),
        "upper" => function_single_string(function, args, |s| s.to_uppercase()),
        "lower" => function_single_string(function, args, |s| s.to_lowercase()),
        "concat" => Ok(Value::String(
            args.iter().map(Value::as_string).collect::<String>(),
        )),
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

/// format(template, args...) - replaces "{0}", "{1}", ... with argument values
fn function_format(args: &[Value]) -> Result<Value, EvalError> {
    let template = match args.first() {
        Some(Value::String(s)) => s,
        Some(other) => {
            return Err(EvalError::TypeError(format!(
                "format() template must be string, got {}",
                type_name(other)
            )));
        }
        None => {
            return Err(EvalError::TypeError(
                "format() requires a template argument".to_string(),
            ));
        }
    };

    let mut result = template.clone();
    for (i, arg) in args[1..].iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), &arg.as_string());
    }
    Ok(Value::String(result))
}

fn function_single_string(
    function: &str,
    args: &[Value],
    apply: impl Fn(&str) -> String,
) -> Result<Value, EvalError> {
    match args {
        [Value::String(s)] => Ok(Value::String(apply(s))),
        [other] => Err(EvalError::TypeError(format!(
            "{}() requires a string, got {}",
            function,
            type_name(other)
        ))),
        _ => Err(EvalError::TypeError(format!(
            "{}() requires exactly one argument",
            function
        ))),
    }
}

fn convert_value(value: Value, ty: &ValueType) -> Result<Value, EvalError> {
    if value.value_type() == *ty {
        return Ok(value);
    }

    match ty {
        ValueType::Float => value.as_float().map(Value::Float).ok_or_else(|| {
            EvalError::TypeError(format!("cannot convert {} to float", type_name(&value)))
        }),
        ValueType::Integer => value.as_int().map(Value::Integer).ok_or_else(|| {
            EvalError::TypeError(format!("cannot convert {} to integer", type_name(&value)))
        }),
        ValueType::String => Ok(Value::String(value.as_string())),
        ValueType::Boolean => Ok(Value::Boolean(value.as_bool())),
        other => Err(EvalError::TypeError(format!(
            "cannot convert {} to {}",
            type_name(&value),
            other.signature()
        ))),
    }
}
