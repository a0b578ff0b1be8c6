use serde::{Deserialize, Serialize};

/// Runtime value in the flint VM.
///
/// `Double` and `Str` are literal values; they are the only values that
/// may appear on a frame's operand stack. `Name` is an interned
/// identifier (a variable, function, or label name) and lives only in
/// the value pool, referenced by instruction operands. `Unset` is the
/// nil value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit floating-point number; the only numeric runtime type.
    Double(f64),

    /// UTF-8 string value.
    Str(String),

    /// An interned name used as an instruction operand.
    Name(String),

    /// Value is not set.
    Unset,
}

impl Value {
    /// True for values that may appear on the execution stack.
    pub fn is_literal(&self) -> bool {
        !matches!(self, Value::Name(_))
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Value::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Name(_) => "name",
            Value::Unset => "unset",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Name(n) => write!(f, "{}", n),
            Value::Unset => write!(f, "nil"),
        }
    }
}
