//! Stock leaf rules for JSON values.
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::catalog::{RuleInfo, STOCK_CATALOG};
use super::{RuleOutcome, RuleProvider};
use crate::scalar::{EnumDomain, Literal};

static NULL: Value = Value::Null;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("email regex")
});
static URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#]+(?:[/?#]\S*)?$").expect("url regex")
});
static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid regex")
});

/// User-supplied predicate registered through [`StockRules::with_rule`].
pub type Predicate = Arc<dyn Fn(&Value, &[Value]) -> bool + Send + Sync>;

/// The stock provider. Construct once at start-up and share it.
pub struct StockRules {
    domain: EnumDomain,
    catalog: IndexMap<String, RuleInfo>,
    custom: HashMap<String, Predicate>,
    /// Compiled `regex` arguments, keyed by pattern source.
    regex_cache: RwLock<HashMap<String, Regex>>,
}

impl StockRules {
    pub fn new(domain: EnumDomain) -> Self {
        Self {
            domain,
            catalog: STOCK_CATALOG.clone(),
            custom: HashMap::new(),
            regex_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register an extra predicate, or replace a stock one.
    pub fn with_rule<F>(mut self, name: &str, info: RuleInfo, predicate: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.catalog.insert(name.to_string(), info);
        self.custom.insert(name.to_string(), Arc::new(predicate));
        self
    }

    fn compiled(&self, pattern: &str) -> Result<Regex, regex::Error> {
        if let Ok(cache) = self.regex_cache.read() {
            if let Some(rx) = cache.get(pattern) {
                return Ok(rx.clone());
            }
        }
        let rx = Regex::new(pattern)?;
        if let Ok(mut cache) = self.regex_cache.write() {
            cache.insert(pattern.to_string(), rx.clone());
        }
        Ok(rx)
    }

    fn matches_regex(&self, s: &str, pattern: &Value) -> bool {
        pattern
            .as_str()
            .and_then(|p| self.compiled(p).ok())
            .is_some_and(|rx| rx.is_match(s))
    }
}

impl Default for StockRules {
    fn default() -> Self {
        Self::new(EnumDomain::default())
    }
}

impl fmt::Debug for StockRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StockRules")
            .field("domain", &self.domain)
            .field("rules", &self.catalog.len())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleProvider for StockRules {
    fn rule_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.catalog.keys().map(String::as_str))
    }

    fn rule_info(&self, rule: &str) -> Option<&RuleInfo> {
        self.catalog.get(rule)
    }

    fn check_args(&self, rule: &str, args: &[Value]) -> Result<(), String> {
        if self.custom.contains_key(rule) {
            return Ok(());
        }
        match rule {
            "range" => {
                let (min, max) = match (args.first().and_then(Value::as_f64), args.get(1).and_then(Value::as_f64)) {
                    (Some(min), Some(max)) => (min, max),
                    _ => return Err("range bounds must be numbers".into()),
                };
                if min > max {
                    return Err(format!("range min {min} exceeds max {max}"));
                }
                Ok(())
            }
            "min" | "max" => match args.first().and_then(Value::as_f64) {
                Some(_) => Ok(()),
                None => Err(format!("{rule} bound must be a number")),
            },
            "minLength" | "maxLength" | "exactLength" | "minSize" | "maxSize" | "exactSize" => {
                match args.first().and_then(Value::as_u64) {
                    Some(_) => Ok(()),
                    None => Err(format!("{rule} expects a non-negative integer")),
                }
            }
            "regex" => match args.first().and_then(Value::as_str) {
                Some(pattern) => self.compiled(pattern).map(|_| ()).map_err(|e| e.to_string()),
                None => Err("regex pattern must be a string".into()),
            },
            "enum" => match args.first() {
                Some(Value::Array(_)) => Ok(()),
                _ => Err("enum expects a list of allowed values".into()),
            },
            _ => Ok(()),
        }
    }

    fn apply(&self, rule: &str, subject: &Value, args: &[Value]) -> RuleOutcome {
        if let Some(predicate) = self.custom.get(rule) {
            return predicate(subject, args).into();
        }
        let arg = |i: usize| args.get(i).unwrap_or(&NULL);
        match rule {
            // ---- type checking ----
            "null" => subject.is_null().into(),
            "boolean" => subject.is_boolean().into(),
            "integer" => (subject.is_i64() || subject.is_u64()).into(),
            "float" => subject.is_f64().into(),
            "number" => match subject {
                Value::Number(n) if n.is_f64() => RuleOutcome::Kind(Cow::Borrowed("float")),
                Value::Number(_) => RuleOutcome::Kind(Cow::Borrowed("integer")),
                _ => RuleOutcome::Fail,
            },
            "string" => subject.is_string().into(),
            "stringable" => matches!(subject, Value::String(_) | Value::Number(_)).into(),
            "scalar" => crate::scalar::is_scalar(subject).into(),
            "scalarNull" => (subject.is_null() || crate::scalar::is_scalar(subject)).into(),
            "array" => subject.is_array().into(),
            "object" => subject.is_object().into(),
            "container" => match subject {
                Value::Array(_) => RuleOutcome::Kind(Cow::Borrowed("array")),
                Value::Object(_) => RuleOutcome::Kind(Cow::Borrowed("object")),
                _ => RuleOutcome::Fail,
            },
            "loopable" => self.loopable(subject).into(),
            "enum" => match arg(0) {
                Value::Array(allowed) => allowed
                    .iter()
                    .filter_map(Literal::from_value)
                    .any(|lit| self.domain.accepts(&lit) && lit.matches(subject))
                    .into(),
                _ => RuleOutcome::Fail,
            },

            // ---- numeric ----
            "range" => with_number(subject, |n| {
                matches!((arg(0).as_f64(), arg(1).as_f64()), (Some(lo), Some(hi)) if lo <= n && n <= hi)
            }),
            "min" => with_number(subject, |n| arg(0).as_f64().is_some_and(|lo| n >= lo)),
            "max" => with_number(subject, |n| arg(0).as_f64().is_some_and(|hi| n <= hi)),
            "positive" => with_number(subject, |n| n > 0.0),
            "negative" => with_number(subject, |n| n < 0.0),
            "nonNegative" => with_number(subject, |n| n >= 0.0),
            "bit32" => subject
                .as_i64()
                .is_some_and(|i| i32::try_from(i).is_ok())
                .into(),
            "bit64" => subject.is_i64().into(),

            // ---- string ----
            "minLength" => with_text(subject, |s| arg(0).as_u64().is_some_and(|n| char_len(&s) >= n)),
            "maxLength" => with_text(subject, |s| arg(0).as_u64().is_some_and(|n| char_len(&s) <= n)),
            "exactLength" => with_text(subject, |s| arg(0).as_u64().is_some_and(|n| char_len(&s) == n)),
            "nonEmpty" => RuleOutcome::from(match subject {
                Value::String(s) => !s.is_empty(),
                Value::Array(xs) => !xs.is_empty(),
                Value::Object(m) => !m.is_empty(),
                _ => false,
            }),
            "regex" => with_text(subject, |s| self.matches_regex(&s, arg(0))),
            "alphaNum" => with_str(subject, |s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())),
            "lowerCase" => with_str(subject, |s| !s.chars().any(char::is_uppercase)),
            "upperCase" => with_str(subject, |s| !s.chars().any(char::is_lowercase)),
            "email" => with_str(subject, |s| s.len() <= 254 && EMAIL.is_match(s)),
            "url" => with_str(subject, |s| URL.is_match(s)),
            "uuid" => with_str(subject, |s| UUID.is_match(s)),
            "dateIso8601" => with_str(subject, |s| {
                s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }),
            "dateTimeIso8601" => with_str(subject, |s| DateTime::parse_from_rfc3339(s).is_ok()),

            // ---- container ----
            "minSize" => with_size(subject, |len| arg(0).as_u64().is_some_and(|n| len >= n)),
            "maxSize" => with_size(subject, |len| arg(0).as_u64().is_some_and(|n| len <= n)),
            "exactSize" => with_size(subject, |len| arg(0).as_u64().is_some_and(|n| len == n)),

            _ => {
                tracing::warn!(rule, "rule not implemented by stock provider");
                RuleOutcome::Fail
            }
        }
    }

    fn enum_domain(&self) -> EnumDomain {
        self.domain
    }
}

// ------------------------------ Utilities --------------------------------- //

fn with_number(subject: &Value, f: impl FnOnce(f64) -> bool) -> RuleOutcome {
    subject.as_f64().is_some_and(f).into()
}

fn with_str(subject: &Value, f: impl FnOnce(&str) -> bool) -> RuleOutcome {
    subject.as_str().is_some_and(f).into()
}

/// Strings as-is, numbers by their JSON text.
fn with_text(subject: &Value, f: impl FnOnce(Cow<'_, str>) -> bool) -> RuleOutcome {
    let ok = match subject {
        Value::String(s) => f(Cow::Borrowed(s)),
        Value::Number(n) => f(Cow::Owned(n.to_string())),
        _ => false,
    };
    ok.into()
}

fn with_size(subject: &Value, f: impl FnOnce(u64) -> bool) -> RuleOutcome {
    let ok = match subject {
        Value::Array(xs) => f(xs.len() as u64),
        Value::Object(m) => f(m.len() as u64),
        _ => false,
    };
    ok.into()
}

fn char_len(s: &str) -> u64 {
    s.chars().count() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passes(rules: &StockRules, rule: &str, subject: Value, args: &[Value]) -> bool {
        rules.apply(rule, &subject, args).passed()
    }

    #[test]
    fn composite_type_rules_report_kind() {
        let rules = StockRules::default();
        assert_eq!(rules.apply("number", &json!(3), &[]), RuleOutcome::Kind("integer".into()));
        assert_eq!(rules.apply("number", &json!(3.5), &[]), RuleOutcome::Kind("float".into()));
        assert_eq!(rules.apply("container", &json!({}), &[]), RuleOutcome::Kind("object".into()));
        assert_eq!(rules.apply("container", &json!("x"), &[]), RuleOutcome::Fail);
    }

    #[test]
    fn numeric_rules() {
        let rules = StockRules::default();
        assert!(passes(&rules, "range", json!(2), &[json!(1), json!(3)]));
        assert!(!passes(&rules, "range", json!(5), &[json!(1), json!(3)]));
        assert!(!passes(&rules, "range", json!("2"), &[json!(1), json!(3)]));
        assert!(passes(&rules, "bit32", json!(i32::MAX), &[]));
        assert!(!passes(&rules, "bit32", json!(i64::from(i32::MAX) + 1), &[]));
        assert!(passes(&rules, "nonNegative", json!(0), &[]));
        assert!(!passes(&rules, "positive", json!(0), &[]));
    }

    #[test]
    fn string_rules() {
        let rules = StockRules::default();
        assert!(passes(&rules, "maxLength", json!("ñandú"), &[json!(5)]));
        assert!(!passes(&rules, "minLength", json!("ab"), &[json!(3)]));
        assert!(passes(&rules, "regex", json!("abc-123"), &[json!(r"^[a-z]+-\d+$")]));
        assert!(!passes(&rules, "regex", json!("abc"), &[json!(r"^\d+$")]));
        assert!(passes(&rules, "email", json!("ada@example.org"), &[]));
        assert!(!passes(&rules, "email", json!("ada@"), &[]));
        assert!(passes(&rules, "url", json!("https://example.com/a?b=c"), &[]));
        assert!(passes(&rules, "uuid", json!("123e4567-e89b-12d3-a456-426614174000"), &[]));
        assert!(passes(&rules, "dateIso8601", json!("2024-02-29"), &[]));
        assert!(!passes(&rules, "dateIso8601", json!("2023-02-29"), &[]));
        assert!(passes(&rules, "dateTimeIso8601", json!("2024-02-29T12:00:00Z"), &[]));
        assert!(passes(&rules, "lowerCase", json!("abc 1"), &[]));
        assert!(!passes(&rules, "upperCase", json!("aBC"), &[]));
    }

    #[test]
    fn enum_respects_domain() {
        let strict = StockRules::new(EnumDomain::Equatable);
        let loose = StockRules::new(EnumDomain::ScalarNullable);
        let allowed = [json!([1.5, null, "a"])];
        assert!(!passes(&strict, "enum", json!(1.5), &allowed));
        assert!(passes(&strict, "enum", json!("a"), &allowed));
        assert!(passes(&loose, "enum", json!(1.5), &allowed));
        assert!(passes(&loose, "enum", json!(null), &allowed));
    }

    #[test]
    fn argument_checks() {
        let rules = StockRules::default();
        assert!(rules.check_args("range", &[json!(1), json!(3)]).is_ok());
        assert!(rules.check_args("range", &[json!(3), json!(1)]).is_err());
        assert!(rules.check_args("regex", &[json!("(")]).is_err());
        assert!(rules.check_args("maxLength", &[json!(-1)]).is_err());
    }

    #[test]
    fn custom_rules_take_precedence() {
        let rules = StockRules::default().with_rule(
            "even",
            RuleInfo::pattern("integer"),
            |subject, _| subject.as_i64().is_some_and(|i| i % 2 == 0),
        );
        assert!(rules.rule_info("even").is_some());
        assert!(passes(&rules, "even", json!(4), &[]));
        assert!(!passes(&rules, "even", json!(3), &[]));
    }

    #[test]
    fn renamed_rules_resolve() {
        let rules = StockRules::default();
        assert_eq!(rules.renamed("bool"), Some("boolean"));
        assert_eq!(rules.renamed("int"), Some("integer"));
        assert_eq!(rules.renamed("nope"), None);
    }
}
