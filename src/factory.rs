//! Rule-set factory.
//!
//! Turns a loosely-typed source into a validated, normalized [`RuleSet`]:
//!
//! 1. classify entries (`factory::source`), resolving renamed rules;
//! 2. check arity and arguments against the provider;
//! 3. order type-checking rules first, inferring one when none is declared;
//! 4. flatten and domain-check `enum` / `alternativeEnum`;
//! 5. recurse into `alternativeRuleSet`, `tableElements` and `listItems`
//!    under a recursion limit.
//!
//! Every problem is a [`ConstructionError`] raised here; nothing is deferred
//! to validation time.
pub mod enums;
pub mod source;

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ConstructionError, Result};
use crate::provider::{RuleProvider, CONTAINER_RULE, ENUM_RULE};
use crate::rule_set::{ListItems, RuleSet, TableElements};

use source::{RawEntry, RawRule};

pub const DEFAULT_RECURSION_LIMIT: usize = 10;

// ------------------------------ Source shapes ----------------------------- //

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct TableElementsSource {
    rules_by_elements: IndexMap<String, Value>,
    #[serde(default)]
    exclusive: bool,
    #[serde(default)]
    whitelist: Vec<String>,
    #[serde(default)]
    blacklist: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ListItemsSource {
    item_rules: Value,
    #[serde(default)]
    min_occur: usize,
    #[serde(default)]
    max_occur: Option<usize>,
}

// -------------------------------- Factory --------------------------------- //

#[derive(Clone, Copy)]
pub struct RuleSetFactory<'p> {
    provider: &'p dyn RuleProvider,
    recursion_limit: usize,
}

impl<'p> RuleSetFactory<'p> {
    pub fn new(provider: &'p dyn RuleProvider) -> Self {
        Self { provider, recursion_limit: DEFAULT_RECURSION_LIMIT }
    }

    /// Maximum nesting of `tableElements` / `listItems` / `alternativeRuleSet`.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    pub fn make(&self, source: &Value) -> Result<RuleSet> {
        let rs = self.build(source, "$", self.recursion_limit, false)?;
        tracing::debug!(depth = rs.depth(), rules = rs.rules.len(), "rule set built");
        Ok(rs)
    }

    /// Parse JSON text, then [`make`](Self::make).
    pub fn make_from_str(&self, src: &str) -> Result<RuleSet> {
        let source = crate::path_de::from_str_with_path::<Value>(src).map_err(|detail| {
            ConstructionError::MalformedSource { path: "$".into(), detail }
        })?;
        self.make(&source)
    }

    // ---- node ----

    fn build(&self, source: &Value, path: &str, remaining: usize, alternative: bool) -> Result<RuleSet> {
        let mut rs = RuleSet::default();
        let mut type_rules = IndexMap::<String, Vec<Value>>::new();
        let mut pattern_rules = IndexMap::<String, Vec<Value>>::new();
        let mut seen = HashSet::<String>::new();

        for entry in source::entries(source, path)? {
            let key = match entry.name.as_str() {
                "allowNull" => {
                    tracing::warn!(path, "'allowNull' is deprecated, use 'nullable'");
                    "nullable".to_string()
                }
                name => name.to_string(),
            };
            match key.as_str() {
                "optional" | "nullable" | "alternativeEnum" | "alternativeRuleSet" | "tableElements"
                | "listItems" => {
                    if !seen.insert(key.clone()) {
                        return Err(ConstructionError::DuplicateRule { path: path.to_string(), rule: key });
                    }
                }
                _ => {}
            }
            match key.as_str() {
                "optional" => rs.optional = flag(&key, &entry, path)?,
                "nullable" => rs.nullable = flag(&key, &entry, path)?,
                "alternativeEnum" => {
                    let RawRule::Args(args) = &entry.rule else {
                        return Err(ConstructionError::MalformedSource {
                            path: path.to_string(),
                            detail: "'alternativeEnum' expects a list of values".into(),
                        });
                    };
                    let domain = self.provider.enum_domain();
                    rs.alternative_enum = Some(enums::flatten_enum(&key, args, domain, path)?);
                }
                "alternativeRuleSet" => {
                    let sub = structure(&key, &entry, path)?;
                    let sub_path = format!("{path}.alternativeRuleSet");
                    if alternative {
                        return Err(ConstructionError::MalformedSource {
                            path: sub_path,
                            detail: "an alternativeRuleSet cannot declare its own alternativeRuleSet".into(),
                        });
                    }
                    rs.alternative_rule_set = Some(Box::new(self.descend(sub, &sub_path, remaining, true)?));
                }
                "tableElements" => {
                    let sub = structure(&key, &entry, path)?;
                    rs.table_elements = Some(self.table_elements(sub, &format!("{path}.tableElements"), remaining)?);
                }
                "listItems" => {
                    let sub = structure(&key, &entry, path)?;
                    rs.list_items = Some(self.list_items(sub, &format!("{path}.listItems"), remaining)?);
                }
                _ => {
                    let Some((name, args)) = self.rule(entry, path)? else { continue };
                    if !seen.insert(name.clone()) {
                        return Err(ConstructionError::DuplicateRule { path: path.to_string(), rule: name });
                    }
                    let type_checking = self
                        .provider
                        .rule_info(&name)
                        .is_some_and(|info| info.type_checking);
                    if type_checking {
                        type_rules.insert(name, args);
                    } else {
                        pattern_rules.insert(name, args);
                    }
                }
            }
        }

        // `enum` narrows another type rule; any other pairing is an
        // intersection of types, and all of them are applied in order.
        if type_rules.len() > 1 && !type_rules.contains_key(ENUM_RULE) {
            let rules: Vec<&str> = type_rules.keys().map(String::as_str).collect();
            tracing::warn!(path, ?rules, "several type-checking rules; the first one decides the type");
        }
        if type_rules.is_empty() {
            let inferred = self.infer_type_rule(&rs, &pattern_rules, path)?;
            tracing::trace!(path, rule = %inferred, "inferred type rule");
            type_rules.insert(inferred, Vec::new());
        }
        rs.rules = type_rules.into_iter().chain(pattern_rules).collect();
        Ok(rs)
    }

    /// `None` when the rule is declared `false`.
    fn rule(&self, entry: RawEntry<'_>, path: &str) -> Result<Option<(String, Vec<Value>)>> {
        let name = self.resolve_name(&entry.name, path)?;
        let info = self
            .provider
            .rule_info(&name)
            .ok_or_else(|| ConstructionError::UnknownRule { path: path.to_string(), rule: name.clone() })?;

        let args = match entry.rule {
            RawRule::Flag(false) => return Ok(None),
            RawRule::Flag(true) | RawRule::Bare => Vec::new(),
            RawRule::Args(args) if name == ENUM_RULE => {
                let allowed = enums::flatten_enum(&name, &args, self.provider.enum_domain(), path)?;
                vec![Value::Array(allowed.iter().map(|lit| lit.to_value()).collect())]
            }
            RawRule::Args(args) => args,
            RawRule::Structure(_) => {
                return Err(ConstructionError::MalformedSource {
                    path: path.to_string(),
                    detail: format!("rule '{name}' cannot take a nested rule set"),
                });
            }
        };

        let given = args.len();
        if given < info.params_required || given > info.params_allowed {
            return Err(ConstructionError::Arity {
                path: path.to_string(),
                rule: name,
                given,
                required: info.params_required,
                allowed: info.params_allowed,
            });
        }
        self.provider
            .check_args(&name, &args)
            .map_err(|detail| ConstructionError::BadArgument {
                path: path.to_string(),
                rule: name.clone(),
                detail,
            })?;
        Ok(Some((name, args)))
    }

    fn resolve_name(&self, name: &str, path: &str) -> Result<String> {
        if self.provider.rule_info(name).is_some() {
            return Ok(name.to_string());
        }
        match self.provider.renamed(name) {
            Some(current) => {
                tracing::warn!(path, old = name, new = current, "deprecated rule name");
                Ok(current.to_string())
            }
            None => Err(ConstructionError::UnknownRule { path: path.to_string(), rule: name.to_string() }),
        }
    }

    fn infer_type_rule(
        &self,
        rs: &RuleSet,
        pattern_rules: &IndexMap<String, Vec<Value>>,
        path: &str,
    ) -> Result<String> {
        let candidate = if rs.table_elements.is_some() || rs.list_items.is_some() {
            Some(CONTAINER_RULE.to_string())
        } else {
            pattern_rules
                .keys()
                .next()
                .and_then(|first| self.provider.rule_info(first))
                .and_then(|info| info.type_affiliation.clone())
        };
        match candidate {
            Some(name) if self.provider.rule_info(&name).is_some_and(|info| info.type_checking) => Ok(name),
            _ => Err(ConstructionError::MissingTypeRule { path: path.to_string() }),
        }
    }

    // ---- descent ----

    fn descend(&self, source: &Value, path: &str, remaining: usize, alternative: bool) -> Result<RuleSet> {
        if remaining == 0 {
            return Err(ConstructionError::RecursionLimit {
                path: path.to_string(),
                limit: self.recursion_limit,
            });
        }
        self.build(source, path, remaining - 1, alternative)
    }

    fn table_elements(&self, source: &Value, path: &str, remaining: usize) -> Result<TableElements> {
        require_key(source, "rulesByElements", path)?;
        let src: TableElementsSource = crate::path_de::from_value_with_path(source)
            .map_err(|detail| ConstructionError::MalformedSource { path: path.to_string(), detail })?;
        let malformed = |detail: &str| ConstructionError::MalformedSource {
            path: path.to_string(),
            detail: detail.to_string(),
        };

        if src.rules_by_elements.is_empty() {
            return Err(malformed("rulesByElements must declare at least one element"));
        }
        if !src.blacklist.is_empty() && (src.exclusive || !src.whitelist.is_empty()) {
            return Err(malformed("blacklist cannot be combined with exclusive or whitelist"));
        }
        if let Some(key) = src
            .whitelist
            .iter()
            .chain(&src.blacklist)
            .find(|k| src.rules_by_elements.contains_key(k.as_str()))
        {
            return Err(malformed(&format!("'{key}' is both declared in rulesByElements and listed")));
        }

        let mut rules_by_elements = IndexMap::with_capacity(src.rules_by_elements.len());
        for (key, sub) in &src.rules_by_elements {
            let sub_path = format!("{path}.rulesByElements.{key}");
            rules_by_elements.insert(key.clone(), self.descend(sub, &sub_path, remaining, false)?);
        }
        Ok(TableElements {
            rules_by_elements,
            exclusive: src.exclusive,
            whitelist: src.whitelist.into_iter().collect::<IndexSet<_>>(),
            blacklist: src.blacklist.into_iter().collect::<IndexSet<_>>(),
        })
    }

    fn list_items(&self, source: &Value, path: &str, remaining: usize) -> Result<ListItems> {
        require_key(source, "itemRules", path)?;
        let src: ListItemsSource = crate::path_de::from_value_with_path(source)
            .map_err(|detail| ConstructionError::MalformedSource { path: path.to_string(), detail })?;

        if let Some(max) = src.max_occur {
            let detail = if max == 0 {
                Some("maxOccur must be at least 1".to_string())
            } else if max < src.min_occur {
                Some(format!("maxOccur {max} is below minOccur {}", src.min_occur))
            } else {
                None
            };
            if let Some(detail) = detail {
                return Err(ConstructionError::MalformedSource { path: path.to_string(), detail });
            }
        }

        let item_rules = self.descend(&src.item_rules, &format!("{path}.itemRules"), remaining, false)?;
        Ok(ListItems {
            item_rules: Box::new(item_rules),
            min_occur: src.min_occur,
            max_occur: src.max_occur,
        })
    }
}

// ------------------------------ Utilities --------------------------------- //

fn flag(key: &str, entry: &RawEntry<'_>, path: &str) -> Result<bool> {
    match entry.rule {
        RawRule::Flag(b) => Ok(b),
        RawRule::Bare => Ok(true),
        _ => Err(ConstructionError::MalformedSource {
            path: path.to_string(),
            detail: format!("'{key}' expects a boolean"),
        }),
    }
}

fn structure<'a>(key: &str, entry: &RawEntry<'a>, path: &str) -> Result<&'a Value> {
    match entry.rule {
        RawRule::Structure(v) => Ok(v),
        _ => Err(ConstructionError::MissingStructure { path: path.to_string(), key: key.to_string() }),
    }
}

fn require_key(source: &Value, key: &str, path: &str) -> Result<()> {
    match source {
        Value::Object(map) if map.contains_key(key) => Ok(()),
        Value::Object(_) => Err(ConstructionError::MissingStructure { path: path.to_string(), key: key.to_string() }),
        other => Err(ConstructionError::MalformedSource {
            path: path.to_string(),
            detail: format!("expected an object, got {}", crate::scalar::value_type(other)),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::StockRules;
    use crate::scalar::{EnumDomain, Literal};
    use serde_json::json;

    fn make(source: Value) -> Result<RuleSet> {
        RuleSetFactory::new(&StockRules::default()).make(&source)
    }

    fn rule_names(rs: &RuleSet) -> Vec<&str> {
        rs.rules().map(|(name, _)| name).collect()
    }

    #[test]
    fn type_rules_are_ordered_first() {
        let rs = make(json!({"maxLength": [5], "regex": ["^a"], "string": true})).unwrap();
        assert_eq!(rule_names(&rs), ["string", "maxLength", "regex"]);
        assert_eq!(rs.type_rule(), Some("string"));
    }

    #[test]
    fn bare_and_keyed_forms_are_equivalent() {
        let keyed = make(json!({"integer": true, "range": [1, 3]})).unwrap();
        let bare = make(json!(["integer", {"range": [1, 3]}])).unwrap();
        let positional = make(json!({"0": "integer", "range": [1, 3]})).unwrap();
        assert_eq!(keyed, bare);
        assert_eq!(keyed, positional);
    }

    #[test]
    fn type_rule_inferred_from_first_pattern_rule() {
        let rs = make(json!({"range": [1, 3]})).unwrap();
        assert_eq!(rule_names(&rs), ["number", "range"]);
        let rs = make(json!({"maxLength": [3], "range": [1, 3]})).unwrap();
        assert_eq!(rs.type_rule(), Some("string"));
    }

    #[test]
    fn container_inferred_for_composites() {
        let rs = make(json!({"maxSize": [4], "listItems": {"itemRules": {"string": true}}})).unwrap();
        assert_eq!(rs.type_rule(), Some("container"));
        let rs = make(json!({"tableElements": {"rulesByElements": {"a": {"string": true}}}})).unwrap();
        assert_eq!(rs.type_rule(), Some("container"));
    }

    #[test]
    fn no_inferable_type_rule_is_an_error() {
        let err = make(json!({"nullable": true})).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingTypeRule { .. }));
    }

    #[test]
    fn unknown_rule_is_an_error() {
        let err = make(json!({"string": true, "sparkly": true})).unwrap_err();
        assert_eq!(err, ConstructionError::UnknownRule { path: "$".into(), rule: "sparkly".into() });
    }

    #[test]
    fn renamed_rules_resolve_to_current_name() {
        let rs = make(json!({"int": true})).unwrap();
        assert_eq!(rule_names(&rs), ["integer"]);
    }

    #[test]
    fn arity_is_checked() {
        let err = make(json!({"range": [1]})).unwrap_err();
        assert!(matches!(err, ConstructionError::Arity { given: 1, required: 2, .. }));
        let err = make(json!({"maxLength": true})).unwrap_err();
        assert!(matches!(err, ConstructionError::Arity { given: 0, .. }));
        let err = make(json!({"string": [1]})).unwrap_err();
        assert!(matches!(err, ConstructionError::Arity { allowed: 0, .. }));
    }

    #[test]
    fn provider_rejects_bad_arguments() {
        let err = make(json!({"regex": ["("]})).unwrap_err();
        assert!(matches!(err, ConstructionError::BadArgument { .. }));
        let err = make(json!({"range": [3, 1]})).unwrap_err();
        assert!(matches!(err, ConstructionError::BadArgument { .. }));
    }

    #[test]
    fn false_flag_drops_the_rule() {
        let rs = make(json!({"string": true, "nonEmpty": false})).unwrap();
        assert_eq!(rule_names(&rs), ["string"]);
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let err = make(json!(["string", {"string": true}])).unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateRule { .. }));
        let err = make(json!({"string": true, "optional": true, "0": "optional"})).unwrap_err();
        assert!(matches!(err, ConstructionError::DuplicateRule { .. }));
    }

    #[test]
    fn allow_null_is_a_nullable_alias() {
        let rs = make(json!({"string": true, "allowNull": true})).unwrap();
        assert!(rs.is_nullable());
    }

    #[test]
    fn enum_arguments_are_normalized() {
        let flat = make(json!({"enum": ["a", "b"]})).unwrap();
        let wrapped = make(json!({"enum": [["a", "b"]]})).unwrap();
        assert_eq!(flat, wrapped);
        assert_eq!(flat.rule("enum"), Some(&[json!(["a", "b"])][..]));
    }

    #[test]
    fn enum_domain_is_enforced() {
        let strict = StockRules::new(EnumDomain::Equatable);
        let factory = RuleSetFactory::new(&strict);
        let err = factory.make(&json!({"enum": [["a", null]]})).unwrap_err();
        assert!(matches!(err, ConstructionError::EnumDomain { value: Literal::Null, .. }));
        let err = factory.make(&json!({"string": true, "alternativeEnum": [1.5]})).unwrap_err();
        assert!(matches!(err, ConstructionError::EnumDomain { .. }));
    }

    #[test]
    fn alternative_enum_is_flattened() {
        let rs = make(json!({"string": true, "alternativeEnum": [[null, 0]]})).unwrap();
        assert_eq!(rs.alternative_enum(), Some(&[Literal::Null, Literal::Int(0)][..]));
    }

    #[test]
    fn table_elements_need_rules_by_elements() {
        let err = make(json!({"tableElements": {"exclusive": true}})).unwrap_err();
        assert_eq!(
            err,
            ConstructionError::MissingStructure { path: "$.tableElements".into(), key: "rulesByElements".into() }
        );
        let err = make(json!(["string", "listItems"])).unwrap_err();
        assert!(matches!(err, ConstructionError::MissingStructure { .. }));
        let err = make(json!({"tableElements": true})).unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }

    #[test]
    fn table_elements_reject_conflicting_lists() {
        let err = make(json!({"tableElements": {
            "rulesByElements": {"a": {"string": true}},
            "exclusive": true,
            "blacklist": ["b"]
        }}))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));

        let err = make(json!({"tableElements": {
            "rulesByElements": {"a": {"string": true}},
            "whitelist": ["b"],
            "blacklist": ["c"]
        }}))
        .unwrap_err();
        assert_eq!(err.path(), "$.tableElements");
        assert!(err.to_string().contains("blacklist"), "{err}");

        let err = make(json!({"tableElements": {
            "rulesByElements": {"a": {"string": true}},
            "whitelist": ["a"]
        }}))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }

    #[test]
    fn unknown_composite_keys_name_their_path() {
        let err = make(json!({"listItems": {"itemRules": {"string": true}, "maxOccurs": 3}})).unwrap_err();
        match err {
            ConstructionError::MalformedSource { path, detail } => {
                assert_eq!(path, "$.listItems");
                assert!(detail.contains("maxOccurs"), "{detail}");
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn list_items_bounds_are_checked() {
        let err = make(json!({"listItems": {"itemRules": {"string": true}, "minOccur": 3, "maxOccur": 2}}))
            .unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
        let err = make(json!({"listItems": {"itemRules": {"string": true}, "maxOccur": 0}})).unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }

    #[test]
    fn nested_errors_carry_full_path() {
        let err = make(json!({"tableElements": {"rulesByElements": {
            "address": {"tableElements": {"rulesByElements": {"city": {"strng": true}}}}
        }}}))
        .unwrap_err();
        assert_eq!(
            err.path(),
            "$.tableElements.rulesByElements.address.tableElements.rulesByElements.city"
        );
    }

    #[test]
    fn alternative_rule_sets_do_not_chain() {
        let err = make(json!({
            "integer": true,
            "alternativeRuleSet": {"string": true, "alternativeRuleSet": {"boolean": true}}
        }))
        .unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }

    fn nested_lists(levels: usize) -> Value {
        let mut src = json!({"string": true});
        for _ in 0..levels {
            src = json!({"listItems": {"itemRules": src}});
        }
        src
    }

    #[test]
    fn recursion_limit_is_enforced() {
        let rules = StockRules::default();
        let factory = RuleSetFactory::new(&rules).with_recursion_limit(3);
        assert_eq!(factory.make(&nested_lists(3)).unwrap().depth(), 3);
        let err = factory.make(&nested_lists(4)).unwrap_err();
        assert!(matches!(err, ConstructionError::RecursionLimit { limit: 3, .. }));
    }

    #[test]
    fn alternative_rule_set_consumes_a_level() {
        let rules = StockRules::default();
        let src = json!({"integer": true, "alternativeRuleSet": {"string": true}});
        let err = RuleSetFactory::new(&rules).with_recursion_limit(0).make(&src).unwrap_err();
        match err {
            ConstructionError::RecursionLimit { path, limit } => {
                assert_eq!(path, "$.alternativeRuleSet");
                assert_eq!(limit, 0);
            }
            other => panic!("unexpected {other}"),
        }
        let rs = RuleSetFactory::new(&rules).with_recursion_limit(1).make(&src).unwrap();
        assert_eq!(rs.depth(), 1);
    }

    #[test]
    fn several_type_rules_keep_declaration_order() {
        let rs = make(json!({"string": true, "integer": true, "maxLength": [3]})).unwrap();
        assert_eq!(rule_names(&rs), ["string", "integer", "maxLength"]);
        assert_eq!(rs.type_rule(), Some("string"));

        let rs = make(json!({"string": true, "enum": ["a", "b"]})).unwrap();
        assert_eq!(rule_names(&rs), ["string", "enum"]);
    }

    #[test]
    fn normalized_source_rebuilds_identically() {
        let src = json!({
            "0": "object",
            "nullable": true,
            "tableElements": {
                "rulesByElements": {
                    "name": {"maxLength": 40},
                    "kind": {"enum": ["a", "b"], "optional": true},
                    "tags": {"listItems": {"itemRules": ["string"], "maxOccur": 5}},
                    "age": {"range": [0, 150], "alternativeEnum": [null, "unknown"]}
                },
                "whitelist": ["extra"]
            }
        });
        let first = make(src).unwrap();
        let second = make(first.to_source()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_source(), second.to_source());
    }

    #[test]
    fn make_from_str_reports_parse_errors() {
        let rules = StockRules::default();
        let factory = RuleSetFactory::new(&rules);
        assert!(factory.make_from_str(r#"{"string": true}"#).is_ok());
        let err = factory.make_from_str(r#"{"string": tru"#).unwrap_err();
        assert!(matches!(err, ConstructionError::MalformedSource { .. }));
    }
}
