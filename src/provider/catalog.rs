use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Per-rule metadata consumed by the factory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleInfo {
    /// Rejects any unexpected subject type without erroring.
    pub type_checking: bool,
    pub params_required: usize,
    pub params_allowed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    /// For pattern rules: the type rule to infer when none is declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_affiliation: Option<String>,
}

impl RuleInfo {
    pub fn type_check() -> Self {
        Self {
            type_checking: true,
            params_required: 0,
            params_allowed: 0,
            renamed_from: None,
            type_affiliation: None,
        }
    }

    pub fn pattern(affiliation: &str) -> Self {
        Self {
            type_checking: false,
            type_affiliation: Some(affiliation.to_string()),
            ..Self::type_check()
        }
    }

    pub fn params(mut self, required: usize, allowed: usize) -> Self {
        self.params_required = required;
        self.params_allowed = allowed.max(required);
        self
    }

    pub fn renamed_from(mut self, old: &str) -> Self {
        self.renamed_from = Some(old.to_string());
        self
    }
}

// ------------------------------ Stock table ------------------------------- //

pub(crate) static STOCK_CATALOG: Lazy<IndexMap<String, RuleInfo>> = Lazy::new(|| {
    let mut m = IndexMap::new();
    let mut add = |name: &str, info: RuleInfo| {
        m.insert(name.to_string(), info);
    };

    // type checking
    add("null", RuleInfo::type_check());
    add("boolean", RuleInfo::type_check().renamed_from("bool"));
    add("integer", RuleInfo::type_check().renamed_from("int"));
    add("float", RuleInfo::type_check());
    add("number", RuleInfo::type_check());
    add("string", RuleInfo::type_check());
    add("stringable", RuleInfo::type_check());
    add("scalar", RuleInfo::type_check());
    add("scalarNull", RuleInfo::type_check());
    add("array", RuleInfo::type_check());
    add("object", RuleInfo::type_check());
    add("container", RuleInfo::type_check());
    add("loopable", RuleInfo::type_check());
    add("enum", RuleInfo::type_check().params(1, 1));

    // numeric
    add("range", RuleInfo::pattern("number").params(2, 2));
    add("min", RuleInfo::pattern("number").params(1, 1));
    add("max", RuleInfo::pattern("number").params(1, 1));
    add("positive", RuleInfo::pattern("number"));
    add("negative", RuleInfo::pattern("number"));
    add("nonNegative", RuleInfo::pattern("number"));
    add("bit32", RuleInfo::pattern("integer"));
    add("bit64", RuleInfo::pattern("integer"));

    // string
    add("minLength", RuleInfo::pattern("string").params(1, 1));
    add("maxLength", RuleInfo::pattern("string").params(1, 1));
    add("exactLength", RuleInfo::pattern("string").params(1, 1));
    add("nonEmpty", RuleInfo::pattern("string"));
    add("regex", RuleInfo::pattern("string").params(1, 1));
    add("alphaNum", RuleInfo::pattern("string"));
    add("lowerCase", RuleInfo::pattern("string"));
    add("upperCase", RuleInfo::pattern("string"));
    add("email", RuleInfo::pattern("string"));
    add("url", RuleInfo::pattern("string"));
    add("uuid", RuleInfo::pattern("string"));
    add("dateIso8601", RuleInfo::pattern("string"));
    add("dateTimeIso8601", RuleInfo::pattern("string"));

    // container
    add("minSize", RuleInfo::pattern("container").params(1, 1));
    add("maxSize", RuleInfo::pattern("container").params(1, 1));
    add("exactSize", RuleInfo::pattern("container").params(1, 1));

    m
});
