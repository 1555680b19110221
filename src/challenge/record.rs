//! Call-scoped failure records.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::scalar::{value_type, Literal};

/// One step of a key path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Key {
    Name(String),
    Index(usize),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => f.write_str(name),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// Root-to-leaf.
    pub key_path: Vec<Key>,
    pub rule: String,
    pub reason: String,
    /// Only scalar subjects are kept verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Literal>,
    /// `"missing"` when the bucket was absent.
    pub subject_type: &'static str,
}

impl FailureRecord {
    pub(crate) fn new(key_path: Vec<Key>, rule: &str, reason: String, subject: Option<&Value>) -> Self {
        let (subject, subject_type) = match subject {
            Some(v) => (
                if crate::scalar::is_scalar(v) { Literal::from_value(v) } else { None },
                value_type(v),
            ),
            None => (None, "missing"),
        };
        Self { key_path, rule: rule.to_string(), reason, subject, subject_type }
    }

    pub fn path_string(&self) -> String {
        if self.key_path.is_empty() {
            return "(root)".to_string();
        }
        self.key_path
            .iter()
            .map(Key::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {} ({}", self.path_string(), self.rule, self.reason, self.subject_type)?;
        if let Some(subject) = &self.subject {
            write!(f, " {subject}")?;
        }
        f.write_str(")")
    }
}

/// Accumulates records for one challenge call. Never stored on a validator.
#[derive(Clone, Debug, Default, Serialize)]
pub struct FailureRecorder {
    records: Vec<FailureRecord>,
}

impl FailureRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: FailureRecord) {
        self.records.push(record);
    }

    pub(crate) fn mark(&self) -> usize {
        self.records.len()
    }

    /// Drop records made since `mark`.
    pub(crate) fn rollback(&mut self, mark: usize) {
        self.records.truncate(mark);
    }

    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<FailureRecord> {
        self.records
    }

    /// Every record of the call, joined by `delimiter`. Empty if it passed.
    pub fn last_failure(&self, delimiter: &str) -> String {
        self.records
            .iter()
            .map(FailureRecord::to_string)
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}
