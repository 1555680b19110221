//! Immutable rule-set tree.
//!
//! A [`RuleSet`] describes one data node: an ordered list of rule invocations
//! (type-checking rules first), the `optional`/`nullable` flags, and the
//! composites that either rescue a failing node (`alternativeEnum`,
//! `alternativeRuleSet`) or descend into its children (`tableElements`,
//! `listItems`).
//!
//! Rule sets are only built by [`RuleSetFactory`](crate::factory::RuleSetFactory)
//! and never change afterwards, so one instance can back any number of
//! concurrent challenges.
pub mod composite;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::scalar::Literal;

pub use composite::{ListItems, TableElements};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    pub(crate) rules: IndexMap<String, Vec<Value>>,
    pub(crate) optional: bool,
    pub(crate) nullable: bool,
    pub(crate) alternative_enum: Option<Vec<Literal>>,
    pub(crate) alternative_rule_set: Option<Box<RuleSet>>,
    pub(crate) table_elements: Option<TableElements>,
    pub(crate) list_items: Option<ListItems>,
}

impl RuleSet {
    /// Rule invocations in evaluation order.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.rules.iter().map(|(name, args)| (name.as_str(), args.as_slice()))
    }

    pub fn rule(&self, name: &str) -> Option<&[Value]> {
        self.rules.get(name).map(Vec::as_slice)
    }

    /// The leading (effective) type-checking rule.
    pub fn type_rule(&self) -> Option<&str> {
        self.rules.keys().next().map(String::as_str)
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn alternative_enum(&self) -> Option<&[Literal]> {
        self.alternative_enum.as_deref()
    }

    pub fn alternative_rule_set(&self) -> Option<&RuleSet> {
        self.alternative_rule_set.as_deref()
    }

    pub fn table_elements(&self) -> Option<&TableElements> {
        self.table_elements.as_ref()
    }

    pub fn list_items(&self) -> Option<&ListItems> {
        self.list_items.as_ref()
    }

    /// `null` passes without evaluating any rule.
    pub(crate) fn admits_null(&self) -> bool {
        self.nullable
            || self
                .alternative_enum
                .as_ref()
                .is_some_and(|xs| xs.contains(&Literal::Null))
    }

    /// Levels of descent below this node (0 for a leaf).
    pub fn depth(&self) -> usize {
        let alt = self.alternative_rule_set.as_ref().map(|rs| rs.depth() + 1);
        let table = self.table_elements.as_ref().map(|te| {
            te.rules_by_elements
                .values()
                .map(|rs| rs.depth() + 1)
                .max()
                .unwrap_or(1)
        });
        let list = self.list_items.as_ref().map(|li| li.item_rules.depth() + 1);
        [alt, table, list].into_iter().flatten().max().unwrap_or(0)
    }

    /// Normalized source form. Feeding it back to the factory yields an
    /// identical rule set.
    pub fn to_source(&self) -> Value {
        let mut o = Map::new();
        for (name, args) in &self.rules {
            let v = if args.is_empty() { Value::Bool(true) } else { Value::Array(args.clone()) };
            o.insert(name.clone(), v);
        }
        if self.optional {
            o.insert("optional".into(), Value::Bool(true));
        }
        if self.nullable {
            o.insert("nullable".into(), Value::Bool(true));
        }
        if let Some(xs) = &self.alternative_enum {
            o.insert(
                "alternativeEnum".into(),
                Value::Array(xs.iter().map(Literal::to_value).collect()),
            );
        }
        if let Some(rs) = &self.alternative_rule_set {
            o.insert("alternativeRuleSet".into(), rs.to_source());
        }
        if let Some(te) = &self.table_elements {
            o.insert("tableElements".into(), te.to_source());
        }
        if let Some(li) = &self.list_items {
            o.insert("listItems".into(), li.to_source());
        }
        Value::Object(o)
    }
}
