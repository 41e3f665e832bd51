use std::collections::HashMap;

/// A dynamic value flowing through the defer pipeline.
///
/// Source items retrieved by the provider, intermediate record fields, and
/// final projection results are all made of this type. Integers and floats
/// are kept distinct so that arithmetic during post-processing preserves
/// whole-number results.
///
/// # Examples
///
/// ```
/// use query_defer::Value;
/// use std::collections::HashMap;
///
/// // Scalar values
/// let null = Value::Null;
/// let boolean = Value::Boolean(true);
/// let integer = Value::Integer(42);
/// let float = Value::Float(3.14);
/// let string = Value::String("hello".to_string());
///
/// // Collections
/// let array = Value::Array(vec![Value::Integer(1), Value::Integer(2)]);
///
/// let mut obj = HashMap::new();
/// obj.insert("key".to_string(), Value::String("value".to_string()));
/// let object = Value::Object(obj);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null
    Null,

    /// Boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object with string keys
    Object(HashMap<String, Value>),
}

/// Static type tag describing the value an expression produces.
///
/// Used to type intermediate record fields and to key the schema registry.
/// `Array` carries its element type so that array-index expressions stay
/// type-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// Null / absent
    Null,
    /// Boolean
    Boolean,
    /// Integer number
    Integer,
    /// Floating-point number
    Float,
    /// UTF-8 string
    String,
    /// Array with the given element type
    Array(Box<ValueType>),
    /// Object with string keys
    Object,
}

impl ValueType {
    /// Order- and type-sensitive signature fragment used in schema cache keys.
    pub fn signature(&self) -> String {
        match self {
            ValueType::Null => "null".to_string(),
            ValueType::Boolean => "boolean".to_string(),
            ValueType::Integer => "integer".to_string(),
            ValueType::Float => "float".to_string(),
            ValueType::String => "string".to_string(),
            ValueType::Array(element) => format!("array({})", element.signature()),
            ValueType::Object => "object".to_string(),
        }
    }
}

impl Value {
    /// Check if the value is truthy (for filter conditions)
    pub fn is_truthy(&self) -> bool {
        use Value::*;
        match self {
            Null => false,
            Boolean(b) => *b,
            Float(n) => *n > 0.0,
            Integer(n) => *n > 0,
            String(s) => !s.is_empty(),
            Array(arr) => !arr.is_empty(),
            Object(obj) => !obj.is_empty(),
        }
    }

    /// Convert to boolean for conditions
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => self.is_truthy(),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) => Some(n.round() as i64),
            _ => None,
        }
    }

    /// Get as string (concatenation, formatting)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => format!("{:?}", self),
        }
    }

    /// The static type tag for this value.
    ///
    /// Array element types are taken from the first element; an empty array
    /// reports `array(null)`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::String(_) => ValueType::String,
            Value::Array(arr) => {
                let element = arr.first().map(Value::value_type).unwrap_or(ValueType::Null);
                ValueType::Array(Box::new(element))
            }
            Value::Object(_) => ValueType::Object,
        }
    }
}
