//! Raw source classification.
//!
//! Loosely-typed sources declare a rule in several shapes: `"rule": true`,
//! `"rule": [args]`, a bare positional `"rule"`, or a single scalar argument.
//! [`classify`] is the one place those shapes are told apart; the factory
//! only ever sees a [`RawRule`].
use serde_json::Value;

use crate::error::{ConstructionError, Result};

/// Reserved keys whose value is a nested structure rather than arguments.
pub const STRUCTURE_KEYS: [&str; 3] = ["alternativeRuleSet", "tableElements", "listItems"];

#[derive(Clone, Debug, PartialEq)]
pub enum RawRule<'a> {
    /// `"rule": true` / `"rule": false`
    Flag(bool),
    /// `"rule": [args]`, `"rule": {named args}` or `"rule": scalar`
    Args(Vec<Value>),
    /// positional `"rule"`
    Bare,
    /// nested source under a structure key
    Structure(&'a Value),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry<'a> {
    /// As written; renames are resolved later.
    pub name: String,
    pub rule: RawRule<'a>,
}

/// Split a rule-set source into entries, in declared order.
pub fn entries<'a>(source: &'a Value, path: &str) -> Result<Vec<RawEntry<'a>>> {
    match source {
        Value::Object(map) => map.iter().map(|(k, v)| classify(k, v, path)).collect(),
        Value::Array(xs) => {
            let mut out = Vec::with_capacity(xs.len());
            for (i, x) in xs.iter().enumerate() {
                match x {
                    Value::String(name) => out.push(RawEntry { name: name.clone(), rule: RawRule::Bare }),
                    Value::Object(map) => {
                        for (k, v) in map {
                            out.push(classify(k, v, path)?);
                        }
                    }
                    other => {
                        return Err(ConstructionError::MalformedSource {
                            path: path.to_string(),
                            detail: format!(
                                "list entry {i} must be a rule name or an object, got {}",
                                crate::scalar::value_type(other)
                            ),
                        });
                    }
                }
            }
            Ok(out)
        }
        other => Err(ConstructionError::MalformedSource {
            path: path.to_string(),
            detail: format!(
                "rule set must be an object or a list, got {}",
                crate::scalar::value_type(other)
            ),
        }),
    }
}

/// Decide what one `key: value` entry declares.
pub fn classify<'a>(key: &str, value: &'a Value, path: &str) -> Result<RawEntry<'a>> {
    let malformed = |detail: String| ConstructionError::MalformedSource {
        path: path.to_string(),
        detail,
    };

    // positional form: {"0": "string"}
    if is_positional_key(key) {
        return match value {
            Value::String(name) => Ok(RawEntry { name: name.clone(), rule: RawRule::Bare }),
            other => Err(malformed(format!(
                "positional entry {key} must be a rule name, got {}",
                crate::scalar::value_type(other)
            ))),
        };
    }

    let rule = if STRUCTURE_KEYS.contains(&key) {
        RawRule::Structure(value)
    } else {
        match value {
            Value::Bool(b) => RawRule::Flag(*b),
            Value::Array(xs) => RawRule::Args(xs.clone()),
            // named arguments, taken positionally in declared order
            Value::Object(map) => RawRule::Args(map.values().cloned().collect()),
            Value::Number(_) | Value::String(_) => RawRule::Args(vec![value.clone()]),
            Value::Null => return Err(malformed(format!("rule '{key}' has a null value"))),
        }
    };
    Ok(RawEntry { name: key.to_string(), rule })
}

fn is_positional_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}
