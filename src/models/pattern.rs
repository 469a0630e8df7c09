//! Learned association patterns.

use super::EntityCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of key a learned pattern matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Exact sender address, e.g. `acme@corp.com`.
    Sender,
    /// Sender domain, e.g. `corp.com`.
    Domain,
}

impl PatternType {
    /// Returns the type as a stable string for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sender => "sender",
            Self::Domain => "domain",
        }
    }

    /// Parses a persisted pattern type string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sender" => Some(Self::Sender),
            "domain" => Some(Self::Domain),
            _ => None,
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A reusable rule mapping a document-derived key to a likely entity.
///
/// `(pattern_type, key)` maps to a small ranked set of target codes ordered
/// by confidence descending. Confidence moves toward 1.0 on approvals and is
/// discounted on rejections, bounded to [0, 1]. Patterns are never deleted;
/// a history of corrections is itself diagnostic data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    /// What kind of key this pattern matches on.
    pub pattern_type: PatternType,
    /// The key, e.g. a sender address or domain.
    pub key: String,
    /// The entity code this pattern points at.
    pub target_code: EntityCode,
    /// Confidence (0.0 to 1.0).
    pub confidence: f64,
    /// How many times human feedback confirmed this pattern.
    pub occurrences: u64,
    /// When this pattern last produced or confirmed a match (Unix epoch
    /// seconds). Kept for a future decay pass.
    pub last_used: u64,
}
