use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map, Value};

use super::RuleSet;

// ---------------------------- tableElements ------------------------------- //

/// Keyed container whose buckets each match their own rule set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableElements {
    pub(crate) rules_by_elements: IndexMap<String, RuleSet>,
    pub(crate) exclusive: bool,
    pub(crate) whitelist: IndexSet<String>,
    pub(crate) blacklist: IndexSet<String>,
}

impl TableElements {
    pub fn rules_by_elements(&self) -> &IndexMap<String, RuleSet> {
        &self.rules_by_elements
    }

    pub fn element(&self, key: &str) -> Option<&RuleSet> {
        self.rules_by_elements.get(key)
    }

    /// Undeclared keys are rejected unless whitelisted.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive || !self.whitelist.is_empty()
    }

    pub fn whitelist(&self) -> &IndexSet<String> {
        &self.whitelist
    }

    pub fn blacklist(&self) -> &IndexSet<String> {
        &self.blacklist
    }

    /// Membership check for a bucket key without a declared rule set.
    pub(crate) fn undeclared_key_violation(&self, key: &str) -> Option<&'static str> {
        if self.blacklist.contains(key) {
            Some("blacklisted element")
        } else if self.is_exclusive() && !self.whitelist.contains(key) {
            Some("element not allowed")
        } else {
            None
        }
    }

    pub(crate) fn to_source(&self) -> Value {
        let rules = self
            .rules_by_elements
            .iter()
            .map(|(k, rs)| (k.clone(), rs.to_source()))
            .collect::<Map<String, Value>>();
        let mut o = json!({ "rulesByElements": rules });
        if self.exclusive {
            o["exclusive"] = Value::Bool(true);
        }
        if !self.whitelist.is_empty() {
            o["whitelist"] = Value::from_iter(self.whitelist.iter().cloned());
        }
        if !self.blacklist.is_empty() {
            o["blacklist"] = Value::from_iter(self.blacklist.iter().cloned());
        }
        o
    }
}

// ------------------------------ listItems --------------------------------- //

/// Loopable container whose every element matches one rule set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListItems {
    pub(crate) item_rules: Box<RuleSet>,
    pub(crate) min_occur: usize,
    pub(crate) max_occur: Option<usize>,
}

impl ListItems {
    pub fn item_rules(&self) -> &RuleSet {
        &self.item_rules
    }

    pub fn min_occur(&self) -> usize {
        self.min_occur
    }

    pub fn max_occur(&self) -> Option<usize> {
        self.max_occur
    }

    pub(crate) fn bounds_violation(&self, count: usize) -> Option<String> {
        if count < self.min_occur {
            return Some(format!("{count} item(s), below minOccur {}", self.min_occur));
        }
        match self.max_occur {
            Some(max) if count > max => Some(format!("{count} item(s), exceeds maxOccur {max}")),
            _ => None,
        }
    }

    pub(crate) fn to_source(&self) -> Value {
        let mut o = json!({ "itemRules": self.item_rules.to_source() });
        if self.min_occur > 0 {
            o["minOccur"] = Value::from(self.min_occur);
        }
        if let Some(max) = self.max_occur {
            o["maxOccur"] = Value::from(max);
        }
        o
    }
}
