//! Declarative validation of JSON documents.
//!
//! A rule-set source (plain JSON) is compiled once by a [`RuleSetFactory`]
//! into an immutable [`RuleSet`], which a [`Validator`] then challenges
//! against any number of subjects, from any number of threads. Leaf
//! predicates come from a pluggable [`RuleProvider`]; [`StockRules`] is the
//! bundled catalog.
//!
//! ```
//! use json_rules::{ChallengeOptions, Validator};
//! use serde_json::json;
//!
//! let validator: Validator = Validator::default();
//! let rules = validator
//!     .factory()
//!     .make(&json!({"integer": true, "range": [1, 10]}))
//!     .unwrap();
//! let verdict = validator.challenge(&json!(42), &rules, ChallengeOptions::RECORD);
//! assert!(!verdict.passed());
//! assert_eq!(verdict.last_failure("\n"), "(root): range failed for arguments [1,10] (integer 42)");
//! ```
pub mod challenge;
pub mod cli;
pub mod error;
pub mod factory;
pub mod jq_exec;
pub mod path_de;
pub mod provider;
pub mod rule_set;
pub mod scalar;

pub use challenge::{Challenge, ChallengeOptions, FailureRecord, FailureRecorder, Key, NodeOutcome, Validator};
pub use error::ConstructionError;
pub use factory::RuleSetFactory;
pub use provider::{RuleInfo, RuleOutcome, RuleProvider, StockRules};
pub use rule_set::{ListItems, RuleSet, TableElements};
pub use scalar::{EnumDomain, Literal};
