//! Construction-time errors.
//!
//! A malformed rule-set source is fatal to schema setup and is always raised
//! by [`RuleSetFactory::make`](crate::factory::RuleSetFactory::make). Runtime
//! validation never produces these; data-shape mismatches are reported as a
//! `false` verdict plus optional failure records.
use thiserror::Error;

use crate::scalar::{EnumDomain, Literal};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    /// The source does not have the shape of a rule set.
    #[error("malformed rule set at {path}: {detail}")]
    MalformedSource { path: String, detail: String },

    /// Neither the provider nor its rename table knows the rule.
    #[error("unknown rule '{rule}' at {path}")]
    UnknownRule { path: String, rule: String },

    #[error("rule '{rule}' declared more than once at {path}")]
    DuplicateRule { path: String, rule: String },

    #[error("rule '{rule}' at {path} takes {required}..={allowed} argument(s), got {given}")]
    Arity {
        path: String,
        rule: String,
        given: usize,
        required: usize,
        allowed: usize,
    },

    /// The provider rejected the argument values.
    #[error("bad argument for rule '{rule}' at {path}: {detail}")]
    BadArgument {
        path: String,
        rule: String,
        detail: String,
    },

    /// No type-checking rule declared and none could be inferred.
    #[error("no type-checking rule at {path} and none can be inferred")]
    MissingTypeRule { path: String },

    /// A reserved composite lacks a required part, e.g. `listItems.itemRules`.
    #[error("missing '{key}' at {path}")]
    MissingStructure { path: String, key: String },

    #[error("'{rule}' value {value} at {path} is outside the enum domain {domain}")]
    EnumDomain {
        path: String,
        rule: String,
        value: Literal,
        domain: EnumDomain,
    },

    /// Enum arguments whose nesting level cannot be decided.
    #[error("ambiguous '{rule}' arguments at {path}: {detail}")]
    AmbiguousEnum {
        path: String,
        rule: String,
        detail: String,
    },

    #[error("recursion limit {limit} exceeded at {path}")]
    RecursionLimit { path: String, limit: usize },
}

impl ConstructionError {
    /// Source path of the offending node, `$` for the root.
    pub fn path(&self) -> &str {
        match self {
            ConstructionError::MalformedSource { path, .. }
            | ConstructionError::UnknownRule { path, .. }
            | ConstructionError::DuplicateRule { path, .. }
            | ConstructionError::Arity { path, .. }
            | ConstructionError::BadArgument { path, .. }
            | ConstructionError::MissingTypeRule { path }
            | ConstructionError::MissingStructure { path, .. }
            | ConstructionError::EnumDomain { path, .. }
            | ConstructionError::AmbiguousEnum { path, .. }
            | ConstructionError::RecursionLimit { path, .. } => path,
        }
    }
}

pub type Result<T, E = ConstructionError> = std::result::Result<T, E>;
