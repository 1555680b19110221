//! `enum` / `alternativeEnum` argument normalization.
//!
//! Sources write the allowed values either flat (`["a", "b"]`) or wrapped as
//! the rule's single argument (`[["a", "b"]]`). Anything else is ambiguous and
//! rejected instead of guessed.
use serde_json::Value;

use crate::error::{ConstructionError, Result};
use crate::scalar::{EnumDomain, Literal};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnumShape {
    Flat,
    Wrapped,
}

/// Tell the flat form from the wrapped form.
pub fn enum_shape(rule: &str, args: &[Value], path: &str) -> Result<EnumShape> {
    let arrays = args.iter().filter(|v| v.is_array()).count();
    match (args.len(), arrays) {
        (0, _) => Err(ConstructionError::MalformedSource {
            path: path.to_string(),
            detail: format!("'{rule}' needs at least one allowed value"),
        }),
        (_, 0) => Ok(EnumShape::Flat),
        (1, 1) => Ok(EnumShape::Wrapped),
        (n, a) => Err(ConstructionError::AmbiguousEnum {
            path: path.to_string(),
            rule: rule.to_string(),
            detail: format!("{a} of {n} arguments are lists"),
        }),
    }
}

/// Flat, domain-checked literal list.
pub fn flatten_enum(rule: &str, args: &[Value], domain: EnumDomain, path: &str) -> Result<Vec<Literal>> {
    let values = match enum_shape(rule, args, path)? {
        EnumShape::Flat => args,
        EnumShape::Wrapped => match &args[0] {
            Value::Array(inner) if inner.is_empty() => {
                return Err(ConstructionError::MalformedSource {
                    path: path.to_string(),
                    detail: format!("'{rule}' needs at least one allowed value"),
                });
            }
            Value::Array(inner) => inner.as_slice(),
            _ => args,
        },
    };

    let mut out = Vec::with_capacity(values.len());
    for v in values {
        let lit = match v {
            Value::Array(_) => {
                return Err(ConstructionError::AmbiguousEnum {
                    path: path.to_string(),
                    rule: rule.to_string(),
                    detail: "allowed values nested more than one level".into(),
                });
            }
            other => Literal::from_value(other).ok_or_else(|| ConstructionError::MalformedSource {
                path: path.to_string(),
                detail: format!(
                    "'{rule}' value {other} is not a scalar or null"
                ),
            })?,
        };
        if !domain.accepts(&lit) {
            return Err(ConstructionError::EnumDomain {
                path: path.to_string(),
                rule: rule.to_string(),
                value: lit,
                domain,
            });
        }
        out.push(lit);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap()
    }

    #[test]
    fn flat_and_wrapped_agree() {
        let flat = flatten_enum("enum", &args(json!(["a", 1, true])), EnumDomain::Equatable, "$").unwrap();
        let wrapped = flatten_enum("enum", &args(json!([["a", 1, true]])), EnumDomain::Equatable, "$").unwrap();
        assert_eq!(flat, wrapped);
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn single_scalar_is_flat() {
        let shape = enum_shape("enum", &args(json!(["only"])), "$").unwrap();
        assert_eq!(shape, EnumShape::Flat);
    }

    #[test]
    fn mixed_nesting_is_ambiguous() {
        for src in [json!([["a"], "b"]), json!([["a"], ["b"]])] {
            let err = flatten_enum("enum", &args(src), EnumDomain::Equatable, "$").unwrap_err();
            assert!(matches!(err, ConstructionError::AmbiguousEnum { .. }), "{err}");
        }
    }

    #[test]
    fn double_wrapping_is_ambiguous() {
        let err = flatten_enum("enum", &args(json!([[["a"]]])), EnumDomain::Equatable, "$").unwrap_err();
        assert!(matches!(err, ConstructionError::AmbiguousEnum { .. }));
    }

    #[test]
    fn empty_lists_are_rejected() {
        assert!(flatten_enum("enum", &[], EnumDomain::Equatable, "$").is_err());
        assert!(flatten_enum("enum", &args(json!([[]])), EnumDomain::Equatable, "$").is_err());
    }

    #[test]
    fn objects_are_not_literals() {
        let err = flatten_enum("enum", &args(json!([{"a": 1}])), EnumDomain::Equatable, "$").unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }

    #[test]
    fn domain_rejects_null_and_float() {
        let err = flatten_enum("alternativeEnum", &args(json!([null])), EnumDomain::Equatable, "$.x").unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::EnumDomain { value: Literal::Null, .. }
        ));
        assert!(flatten_enum("enum", &args(json!([1.5])), EnumDomain::EquatableNullable, "$").is_err());
        assert!(flatten_enum("enum", &args(json!([1.5, null])), EnumDomain::ScalarNullable, "$").is_ok());
    }
}
