//! Scalar literals and the enum domain.
//!
//! `enum` and `alternativeEnum` both compare a subject against a flat list of
//! literals. Which literal kinds are admissible is a property of the rule
//! provider (its [`EnumDomain`]); the comparison itself is shared.
use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

// ------------------------------- Literal ---------------------------------- //

/// A `scalar|null` value as accepted by `enum` / `alternativeEnum`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
}

impl Literal {
    /// `None` for arrays, objects and integers beyond `i64`.
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Null => Some(Literal::Null),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Literal::Int(i))
                } else if n.is_u64() {
                    None
                } else {
                    n.as_f64().map(|f| Literal::Float(OrderedFloat(f)))
                }
            }
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::from(*i),
            Literal::Float(f) => Value::from(f.0),
            Literal::String(s) => Value::String(s.clone()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "boolean",
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
        }
    }

    /// Strict comparison: no int/float cross matching, floats within epsilon.
    pub fn matches(&self, subject: &Value) -> bool {
        match (self, subject) {
            (Literal::Null, Value::Null) => true,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Int(a), Value::Number(n)) => n.as_i64() == Some(*a),
            (Literal::Float(a), Value::Number(n)) => {
                if n.is_i64() || n.is_u64() {
                    return false;
                }
                n.as_f64().is_some_and(|b| (a.0 - b).abs() < f64::EPSILON)
            }
            (Literal::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(x) => write!(f, "{}", x.0),
            Literal::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Shared by the `enum` rule and `alternativeEnum`.
pub fn enum_matches<'a, I>(allowed: I, subject: &Value) -> bool
where
    I: IntoIterator<Item = &'a Literal>,
{
    allowed.into_iter().any(|lit| lit.matches(subject))
}

// ------------------------------ EnumDomain -------------------------------- //

/// Which literal kinds a provider's `enum` accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EnumDomain {
    /// bool, int, string
    Equatable,
    /// bool, int, string, null
    #[default]
    EquatableNullable,
    /// bool, int, float, string
    Scalar,
    /// bool, int, float, string, null
    ScalarNullable,
}

impl EnumDomain {
    pub fn accepts(self, lit: &Literal) -> bool {
        match lit {
            Literal::Bool(_) | Literal::Int(_) | Literal::String(_) => true,
            Literal::Null => matches!(self, EnumDomain::EquatableNullable | EnumDomain::ScalarNullable),
            Literal::Float(_) => matches!(self, EnumDomain::Scalar | EnumDomain::ScalarNullable),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            EnumDomain::Equatable => "bool|int|string",
            EnumDomain::EquatableNullable => "bool|int|string|null",
            EnumDomain::Scalar => "bool|int|float|string",
            EnumDomain::ScalarNullable => "bool|int|float|string|null",
        }
    }
}

impl fmt::Display for EnumDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

// ------------------------------ Utilities --------------------------------- //

/// Type name used in failure records.
pub fn value_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::Bool(_) | Value::Number(_) | Value::String(_))
}
