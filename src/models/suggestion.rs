//! Suggestions awaiting review and the decisions that resolve them.

use super::{DocumentId, EntityCode, LinkMethod};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuggestionId(String);

impl SuggestionId {
    /// Creates a new suggestion ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SuggestionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SuggestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a suggestion.
///
/// `Pending` is the only non-terminal state; every other state is terminal
/// and reached by exactly one human decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    /// Awaiting a human decision.
    Pending,
    /// The human agreed with the proposed entity.
    Approved,
    /// The human supplied a different entity.
    Corrected,
    /// The human rejected the proposal; no link was created.
    Rejected,
    /// Not applicable (e.g. non-business correspondence); never resurfaced.
    Skipped,
}

impl SuggestionStatus {
    /// Returns the status as a stable string for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Corrected => "corrected",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a persisted status string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "corrected" => Some(Self::Corrected),
            "rejected" => Some(Self::Rejected),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Whether this status is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A proposed, unconfirmed link awaiting human judgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Unique identifier.
    pub id: SuggestionId,
    /// The document the proposal concerns.
    pub document_id: DocumentId,
    /// The proposed entity code.
    pub proposed_entity_code: EntityCode,
    /// Confidence of the proposal (0.0 to 1.0).
    pub confidence: f64,
    /// Which tier produced the proposal.
    pub method: LinkMethod,
    /// Human-readable evidence for the proposal.
    pub evidence: String,
    /// Current state.
    pub status: SuggestionStatus,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: u64,
    /// Decision timestamp (Unix epoch seconds), once terminal.
    pub decided_at: Option<u64>,
}

/// Action a human takes on a pending suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Agree with the proposed entity.
    Approve,
    /// Link to a different entity instead.
    Correct,
    /// The proposal is wrong; do not link.
    Reject,
    /// The document is not applicable; do not resurface it.
    Skip,
}

impl DecisionAction {
    /// Returns the action as a stable string for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Correct => "correct",
            Self::Reject => "reject",
            Self::Skip => "skip",
        }
    }

    /// Parses an action string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(Self::Approve),
            "correct" => Some(Self::Correct),
            "reject" => Some(Self::Reject),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }

    /// The terminal status this action moves a suggestion to.
    #[must_use]
    pub const fn terminal_status(self) -> SuggestionStatus {
        match self {
            Self::Approve => SuggestionStatus::Approved,
            Self::Correct => SuggestionStatus::Corrected,
            Self::Reject => SuggestionStatus::Rejected,
            Self::Skip => SuggestionStatus::Skipped,
        }
    }
}

impl fmt::Display for DecisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of what a human chose for a suggestion.
///
/// Immutable once written; feeds the learning loop exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// The suggestion this decision resolved.
    pub suggestion_id: SuggestionId,
    /// The action taken.
    pub action: DecisionAction,
    /// The corrected entity code, when `action` is `Correct`.
    pub corrected_entity_code: Option<EntityCode>,
    /// Who decided.
    pub actor: String,
    /// Decision timestamp (Unix epoch seconds).
    pub decided_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SuggestionStatus::Pending,
            SuggestionStatus::Approved,
            SuggestionStatus::Corrected,
            SuggestionStatus::Rejected,
            SuggestionStatus::Skipped,
        ] {
            assert_eq!(SuggestionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_only_pending_is_non_terminal() {
        assert!(!SuggestionStatus::Pending.is_terminal());
        assert!(SuggestionStatus::Approved.is_terminal());
        assert!(SuggestionStatus::Corrected.is_terminal());
        assert!(SuggestionStatus::Rejected.is_terminal());
        assert!(SuggestionStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_action_terminal_status() {
        assert_eq!(
            DecisionAction::Approve.terminal_status(),
            SuggestionStatus::Approved
        );
        assert_eq!(
            DecisionAction::Correct.terminal_status(),
            SuggestionStatus::Corrected
        );
        assert_eq!(
            DecisionAction::Reject.terminal_status(),
            SuggestionStatus::Rejected
        );
        assert_eq!(
            DecisionAction::Skip.terminal_status(),
            SuggestionStatus::Skipped
        );
    }

    #[test]
    fn test_action_parse() {
        assert_eq!(DecisionAction::parse("approve"), Some(DecisionAction::Approve));
        assert_eq!(DecisionAction::parse("nope"), None);
    }
}
