//! Severity-tagged suggestion records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority label attached to a [`Suggestion`].
///
/// Labels other than the three known ones survive from structured input as
/// [`Severity::Other`], uppercased but otherwise verbatim. Serialized as the
/// bare label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// `HIGH`
    High,
    /// `MEDIUM`
    Medium,
    /// `LOW`
    Low,
    /// Any other non-empty label, stored uppercase.
    #[serde(untagged)]
    Other(String),
}

impl Severity {
    /// Normalize a label: trimmed and uppercased. A blank label becomes
    /// [`Severity::Medium`] so severities are never empty.
    pub fn from_label(label: &str) -> Self {
        let upper = label.trim().to_uppercase();
        match upper.as_str() {
            "HIGH" => Self::High,
            "MEDIUM" | "" => Self::Medium,
            "LOW" => Self::Low,
            _ => Self::Other(upper),
        }
    }

    /// The uppercase label.
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Other(label) => label,
        }
    }

    /// Case-insensitive exact comparison against `label`.
    pub fn matches(&self, label: &str) -> bool {
        self.as_str() == label.to_uppercase()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One improvement suggestion extracted from model output.
///
/// `number` is whatever ordinal the text carried (or a parser-assigned one);
/// it is advisory only, the position in the parsed list is the real order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Positive ordinal.
    pub number: u32,
    /// Severity classification.
    pub severity: Severity,
    /// Non-empty one-line title.
    pub title: String,
    /// Continuation lines joined with single spaces. May be empty.
    pub description: String,
}
