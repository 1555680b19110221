//! Leaf rule provider contract.
//!
//! The engine never implements leaf predicates. Everything it knows about a
//! rule name (arity, whether it is type-checking, what it was renamed from,
//! which type a pattern rule assumes) comes from a [`RuleProvider`], and every
//! predicate call goes through [`RuleProvider::apply`].
pub mod catalog;
pub mod stock;

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::Value;

use crate::scalar::EnumDomain;

pub use catalog::RuleInfo;
pub use stock::StockRules;

/// Type rule inferred for nodes declaring `tableElements` or `listItems`.
pub const CONTAINER_RULE: &str = "container";
/// Rule whose argument is normalized to a flat literal list.
pub const ENUM_RULE: &str = "enum";

// ------------------------------- Outcome ---------------------------------- //

/// Result of one predicate call.
///
/// Composite type rules may report what they matched (`"integer"`,
/// `"object"`, ...). The engine only cares that it is a pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Fail,
    Kind(Cow<'static, str>),
}

impl RuleOutcome {
    pub fn passed(&self) -> bool {
        !matches!(self, RuleOutcome::Fail)
    }
}

impl From<bool> for RuleOutcome {
    fn from(b: bool) -> Self {
        if b { RuleOutcome::Pass } else { RuleOutcome::Fail }
    }
}

/// How a container exposes its buckets to `tableElements`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    /// String keys (JSON object).
    Keyed,
    /// Positional keys (JSON array).
    Indexed,
}

// -------------------------------- Trait ----------------------------------- //

pub trait RuleProvider: Send + Sync {
    fn rule_names(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn rule_info(&self, rule: &str) -> Option<&RuleInfo>;

    /// Current name of a rule that used to be called `old`.
    fn renamed(&self, old: &str) -> Option<&str> {
        self.rule_names().find(|name| {
            self.rule_info(name)
                .and_then(|info| info.renamed_from.as_deref())
                == Some(old)
        })
    }

    /// Construction-time argument check; `Err` carries a human reason.
    fn check_args(&self, _rule: &str, _args: &[Value]) -> Result<(), String> {
        Ok(())
    }

    fn apply(&self, rule: &str, subject: &Value, args: &[Value]) -> RuleOutcome;

    fn enum_domain(&self) -> EnumDomain;

    fn container_kind(&self, subject: &Value) -> Option<ContainerKind> {
        match subject {
            Value::Object(_) => Some(ContainerKind::Keyed),
            Value::Array(_) => Some(ContainerKind::Indexed),
            _ => None,
        }
    }

    fn loopable(&self, subject: &Value) -> bool {
        matches!(subject, Value::Array(_) | Value::Object(_))
    }
}

impl<P: RuleProvider + ?Sized> RuleProvider for Arc<P> {
    fn rule_names(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        (**self).rule_names()
    }
    fn rule_info(&self, rule: &str) -> Option<&RuleInfo> {
        (**self).rule_info(rule)
    }
    fn renamed(&self, old: &str) -> Option<&str> {
        (**self).renamed(old)
    }
    fn check_args(&self, rule: &str, args: &[Value]) -> Result<(), String> {
        (**self).check_args(rule, args)
    }
    fn apply(&self, rule: &str, subject: &Value, args: &[Value]) -> RuleOutcome {
        (**self).apply(rule, subject, args)
    }
    fn enum_domain(&self) -> EnumDomain {
        (**self).enum_domain()
    }
    fn container_kind(&self, subject: &Value) -> Option<ContainerKind> {
        (**self).container_kind(subject)
    }
    fn loopable(&self, subject: &Value) -> bool {
        (**self).loopable(subject)
    }
}
