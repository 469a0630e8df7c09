//! Confirmed document-entity links.

use super::{DocumentId, EntityCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a link was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMethod {
    /// An explicit entity code was found in the document text.
    ExplicitCode,
    /// A learned sender/domain pattern matched.
    LearnedPattern,
    /// The LLM classifier proposed the entity.
    Oracle,
    /// A human chose the entity during review.
    Manual,
}

impl LinkMethod {
    /// Returns the method as a stable string for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExplicitCode => "explicit_code",
            Self::LearnedPattern => "learned_pattern",
            Self::Oracle => "oracle",
            Self::Manual => "manual",
        }
    }

    /// Parses a persisted method string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "explicit_code" => Some(Self::ExplicitCode),
            "learned_pattern" => Some(Self::LearnedPattern),
            "oracle" => Some(Self::Oracle),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for LinkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A confirmed association between exactly one document and one entity.
///
/// At most one link exists per document; re-resolving an already-linked
/// document is a no-op. Links are never deleted, only superseded by a
/// corrected link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// The document this link belongs to.
    pub document_id: DocumentId,
    /// The linked entity's canonical code.
    pub entity_code: EntityCode,
    /// Confidence at link time (0.0 to 1.0).
    pub confidence: f64,
    /// How the link was produced.
    pub method: LinkMethod,
    /// Human-readable evidence for the link.
    pub evidence: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
}
