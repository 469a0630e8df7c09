//! # Corrlink
//!
//! Links inbound business correspondence to the structured entities it
//! concerns (projects, proposals, accounts) and improves its own accuracy
//! over time from human corrections.
//!
//! The core is a tiered resolver: an explicit-code matcher, a learned-pattern
//! matcher, and a last-resort LLM classifier, in that order. A confidence
//! gate decides per result whether to auto-apply the link or enqueue it for
//! human review, and a feedback loop turns review decisions into learned
//! patterns that benefit future runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use corrlink::{ResolutionService, SqliteStore};
//!
//! let store = SqliteStore::open(".corrlink/corrlink.db")?;
//! let summary = resolution.run_resolution(50, true)?;
//! println!("auto-linked {}, enqueued {}", summary.auto_linked, summary.enqueued);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod llm;
pub mod matching;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{CorrlinkConfig, LlmConfig, LlmProviderKind};
pub use llm::{Classification, Classifier};
pub use models::{
    Decision, DecisionAction, Document, DocumentId, Entity, EntityCode, LearnedPattern, Link,
    LinkMethod, PatternType, Resolution, RunSummary, Suggestion, SuggestionId, SuggestionStatus,
};
pub use services::{GateOutcome, LearningService, ResolutionService, ReviewService};
pub use storage::{DocumentSource, EntityCatalog, SqliteStore};

/// Error type for corrlink operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Missing required parameters, malformed decision actions |
/// | `OperationFailed` | Database queries fail, HTTP requests to the classifier fail |
/// | `Conflict` | A decision is attempted on an already-decided suggestion |
/// | `UnknownEntity` | A correction names an entity code absent from the catalog |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - A decision action string cannot be parsed
    /// - A correction is requested without a corrected entity code
    /// - A batch size of zero is requested
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` operations fail
    /// - Classifier HTTP requests fail or return malformed responses
    /// - Schema migrations cannot be applied
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A suggestion has already been decided.
    ///
    /// Suggestions are decided exactly once; a second attempt surfaces this
    /// error instead of silently overwriting history.
    #[error("suggestion '{suggestion_id}' already decided: {status}")]
    Conflict {
        /// The suggestion that was already terminal.
        suggestion_id: String,
        /// The terminal status it holds.
        status: String,
    },

    /// An entity code does not exist in the catalog.
    ///
    /// Raised before any write when a correction names an unknown code,
    /// leaving the original suggestion pending.
    #[error("unknown entity code: {0}")]
    UnknownEntity(String),
}

/// Result type alias for corrlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized so every persisted timestamp comes from one implementation.
/// Falls back to 0 if the system clock is before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
