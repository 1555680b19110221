//! Recursive validation engine.
//!
//! [`Validator::challenge`] walks a subject against a [`RuleSet`]. Per node:
//!
//! - `null` passes outright when the node is nullable or its
//!   `alternativeEnum` holds `null`;
//! - the rule list runs in order and the first failing rule ends the node's
//!   primary evaluation;
//! - a primary failure may be rescued by `alternativeEnum`, else by one level
//!   of `alternativeRuleSet`;
//! - after a primary pass, `tableElements` is tried, then `listItems` if the
//!   table is absent or unsatisfied.
//!
//! Without `CONTINUE` the first failure aborts the walk. With it every failure
//! is reached, and the verdict is `false` iff something was recorded.
//!
//! All call state lives in a per-call [`Walk`]; a validator is freely shared
//! between threads.
pub mod options;
pub mod record;

use serde_json::Value;

use crate::factory::{RuleSetFactory, DEFAULT_RECURSION_LIMIT};
use crate::provider::{ContainerKind, RuleProvider, StockRules};
use crate::rule_set::{ListItems, RuleSet, TableElements};
use crate::scalar::enum_matches;

pub use options::ChallengeOptions;
pub use record::{FailureRecord, FailureRecorder, Key};

/// Rule names used for structural failures.
pub const REQUIRED: &str = "required";
pub const TABLE_ELEMENTS: &str = "tableElements";
pub const LIST_ITEMS: &str = "listItems";
pub const RECURSION_LIMIT: &str = "recursionLimit";

// ------------------------------- Outcomes --------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeOutcome {
    Passed,
    /// `null` admitted by `nullable` or by `alternativeEnum`.
    PassedNullable,
    PassedViaAlternativeEnum,
    PassedViaAlternativeRuleSet,
    Failed,
}

impl NodeOutcome {
    pub fn passed(self) -> bool {
        !matches!(self, NodeOutcome::Failed)
    }
}

/// Verdict of one challenge call.
#[derive(Clone, Debug)]
pub struct Challenge {
    outcome: NodeOutcome,
    failures: Option<FailureRecorder>,
}

impl Challenge {
    pub fn passed(&self) -> bool {
        self.outcome.passed()
    }

    /// How the root node was decided.
    pub fn outcome(&self) -> NodeOutcome {
        self.outcome
    }

    /// Present when the call was made with `RECORD`.
    pub fn failures(&self) -> Option<&FailureRecorder> {
        self.failures.as_ref()
    }

    pub fn into_failures(self) -> Option<FailureRecorder> {
        self.failures
    }

    pub fn last_failure(&self, delimiter: &str) -> String {
        self.failures
            .as_ref()
            .map(|rec| rec.last_failure(delimiter))
            .unwrap_or_default()
    }
}

impl From<Challenge> for bool {
    fn from(c: Challenge) -> bool {
        c.passed()
    }
}

// ------------------------------- Validator -------------------------------- //

/// Provider plus runtime limits. Build once, share everywhere.
#[derive(Debug)]
pub struct Validator<P = StockRules> {
    provider: P,
    max_depth: usize,
}

impl Default for Validator<StockRules> {
    fn default() -> Self {
        Self::new(StockRules::default())
    }
}

impl<P: RuleProvider> Validator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider, max_depth: DEFAULT_RECURSION_LIMIT }
    }

    /// Descents allowed before a node fails with `recursionLimit`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Factory over this validator's provider, limited to the same depth.
    pub fn factory(&self) -> RuleSetFactory<'_> {
        RuleSetFactory::new(&self.provider).with_recursion_limit(self.max_depth)
    }

    pub fn validate(&self, subject: &Value, rule_set: &RuleSet) -> bool {
        self.challenge(subject, rule_set, ChallengeOptions::NONE).passed()
    }

    pub fn challenge(&self, subject: &Value, rule_set: &RuleSet, options: ChallengeOptions) -> Challenge {
        self.challenge_bucket(Some(subject), rule_set, options)
    }

    /// `None` is the missing-bucket sentinel. At the root it always fails:
    /// `optional` only means something inside a parent container.
    pub fn challenge_bucket(
        &self,
        subject: Option<&Value>,
        rule_set: &RuleSet,
        options: ChallengeOptions,
    ) -> Challenge {
        let mut walk = Walk::new(&self.provider, options);
        let outcome = match subject {
            None => {
                walk.fail(REQUIRED, "missing required element", None);
                NodeOutcome::Failed
            }
            Some(v) => walk.node(v, rule_set, self.max_depth, false),
        };
        tracing::trace!(?outcome, records = walk.recorder.len(), "challenge finished");
        Challenge {
            outcome,
            failures: options.contains(ChallengeOptions::RECORD).then_some(walk.recorder),
        }
    }
}

// --------------------------------- Walk ----------------------------------- //

/// Per-call traversal state.
struct Walk<'p, P: ?Sized> {
    provider: &'p P,
    record: bool,
    keep_going: bool,
    recorder: FailureRecorder,
    path: Vec<Key>,
}

impl<'p, P: RuleProvider + ?Sized> Walk<'p, P> {
    fn new(provider: &'p P, options: ChallengeOptions) -> Self {
        Self {
            provider,
            record: options.contains(ChallengeOptions::RECORD),
            keep_going: options.contains(ChallengeOptions::CONTINUE),
            recorder: FailureRecorder::new(),
            path: Vec::new(),
        }
    }

    fn fail(&mut self, rule: &str, reason: impl Into<String>, subject: Option<&Value>) {
        if !self.record {
            return;
        }
        let record = FailureRecord::new(self.path.clone(), rule, reason.into(), subject);
        tracing::trace!(failure = %record, "recorded");
        self.recorder.push(record);
    }

    // ---- node ----

    fn node(&mut self, subject: &Value, rs: &RuleSet, depth_left: usize, alternative: bool) -> NodeOutcome {
        if subject.is_null() && rs.admits_null() {
            return NodeOutcome::PassedNullable;
        }
        match self.primary(subject, rs) {
            None => {
                if self.composites(subject, rs, depth_left) {
                    NodeOutcome::Passed
                } else {
                    NodeOutcome::Failed
                }
            }
            Some((rule, args)) => self.rescue(subject, rs, rule, args, depth_left, alternative),
        }
    }

    /// First failing rule, if any.
    fn primary<'r>(&self, subject: &Value, rs: &'r RuleSet) -> Option<(&'r str, &'r [Value])> {
        rs.rules()
            .find(|(name, args)| !self.provider.apply(name, subject, args).passed())
    }

    fn rescue(
        &mut self,
        subject: &Value,
        rs: &RuleSet,
        rule: &str,
        args: &[Value],
        depth_left: usize,
        alternative: bool,
    ) -> NodeOutcome {
        if let Some(allowed) = rs.alternative_enum() {
            if enum_matches(allowed, subject) {
                return NodeOutcome::PassedViaAlternativeEnum;
            }
        }

        let mark = self.recorder.mark();
        let reason = if args.is_empty() {
            "failed".to_string()
        } else {
            format!("failed for arguments {}", Value::from(args.to_vec()))
        };
        self.fail(rule, reason, Some(subject));

        let Some(alt) = rs.alternative_rule_set() else {
            return NodeOutcome::Failed;
        };
        if alternative {
            return NodeOutcome::Failed;
        }
        if depth_left == 0 {
            self.fail(RECURSION_LIMIT, "alternativeRuleSet exceeds max depth", Some(subject));
            return NodeOutcome::Failed;
        }
        if self.node(subject, alt, depth_left - 1, true).passed() {
            self.recorder.rollback(mark);
            NodeOutcome::PassedViaAlternativeRuleSet
        } else {
            NodeOutcome::Failed
        }
    }

    // ---- composites ----

    fn composites(&mut self, subject: &Value, rs: &RuleSet, depth_left: usize) -> bool {
        let (table, list) = (rs.table_elements(), rs.list_items());
        if table.is_none() && list.is_none() {
            return true;
        }
        if depth_left == 0 {
            self.fail(RECURSION_LIMIT, "nesting exceeds max depth", Some(subject));
            return false;
        }
        let depth = depth_left - 1;
        match (table, list) {
            (Some(te), None) => self.table(subject, te, depth),
            (None, Some(li)) => self.list(subject, li, depth),
            (Some(te), Some(li)) => {
                let mark = self.recorder.mark();
                if self.table(subject, te, depth) {
                    return true;
                }
                if self.list(subject, li, depth) {
                    self.recorder.rollback(mark);
                    true
                } else {
                    false
                }
            }
            (None, None) => true,
        }
    }

    fn table(&mut self, subject: &Value, te: &TableElements, depth: usize) -> bool {
        let mut ok = true;
        match (self.provider.container_kind(subject), subject) {
            (Some(ContainerKind::Keyed), Value::Object(map)) => {
                for (name, value) in map {
                    if !self.bucket(te, name, Key::Name(name.clone()), value, depth) {
                        ok = false;
                        if !self.keep_going {
                            return false;
                        }
                    }
                }
            }
            (Some(ContainerKind::Indexed), Value::Array(xs)) => {
                for (i, value) in xs.iter().enumerate() {
                    if !self.bucket(te, &i.to_string(), Key::Index(i), value, depth) {
                        ok = false;
                        if !self.keep_going {
                            return false;
                        }
                    }
                }
            }
            _ => {
                self.fail(TABLE_ELEMENTS, "subject is not a keyed container", Some(subject));
                return false;
            }
        }

        for (name, sub) in te.rules_by_elements() {
            if sub.is_optional() || has_bucket(subject, name) {
                continue;
            }
            self.path.push(Key::Name(name.clone()));
            self.fail(REQUIRED, "missing required element", None);
            self.path.pop();
            ok = false;
            if !self.keep_going {
                return false;
            }
        }
        ok
    }

    fn bucket(&mut self, te: &TableElements, name: &str, key: Key, value: &Value, depth: usize) -> bool {
        self.path.push(key);
        let ok = match te.element(name) {
            Some(sub) => self.node(value, sub, depth, false).passed(),
            None => match te.undeclared_key_violation(name) {
                Some(reason) => {
                    self.fail(TABLE_ELEMENTS, reason, Some(value));
                    false
                }
                None => true,
            },
        };
        self.path.pop();
        ok
    }

    fn list(&mut self, subject: &Value, li: &ListItems, depth: usize) -> bool {
        if !self.provider.loopable(subject) {
            self.fail(LIST_ITEMS, "subject is not loopable", Some(subject));
            return false;
        }
        let count = match subject {
            Value::Array(xs) => xs.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        };

        let mut ok = true;
        if let Some(reason) = li.bounds_violation(count) {
            self.fail(LIST_ITEMS, reason, Some(subject));
            if !self.keep_going {
                return false;
            }
            ok = false;
        }

        match subject {
            Value::Array(xs) => {
                for (i, item) in xs.iter().enumerate() {
                    if !self.item(Key::Index(i), item, li, depth) {
                        ok = false;
                        if !self.keep_going {
                            return false;
                        }
                    }
                }
            }
            Value::Object(map) => {
                for (name, item) in map {
                    if !self.item(Key::Name(name.clone()), item, li, depth) {
                        ok = false;
                        if !self.keep_going {
                            return false;
                        }
                    }
                }
            }
            _ => {}
        }
        ok
    }

    fn item(&mut self, key: Key, item: &Value, li: &ListItems, depth: usize) -> bool {
        self.path.push(key);
        let ok = self.node(item, li.item_rules(), depth, false).passed();
        self.path.pop();
        ok
    }
}

fn has_bucket(subject: &Value, name: &str) -> bool {
    match subject {
        Value::Object(map) => map.contains_key(name),
        // only canonical indices name a bucket: "00" and "+0" do not
        Value::Array(xs) => name
            .parse::<usize>()
            .is_ok_and(|i| i < xs.len() && i.to_string() == name),
        _ => false,
    }
}
