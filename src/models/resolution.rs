//! Resolution results and run summaries.

use super::{DocumentId, EntityCode, LinkMethod};
use serde::{Deserialize, Serialize};

/// One tier's answer for a single document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// The document that was resolved.
    pub document_id: DocumentId,
    /// The entity the document concerns.
    pub entity_code: EntityCode,
    /// Confidence of the result (0.0 to 1.0).
    pub confidence: f64,
    /// Which tier produced the result.
    pub method: LinkMethod,
    /// Human-readable evidence.
    pub evidence: String,
}

/// Counts reported by a resolution run.
///
/// Partial failures are visible in `failed` without halting the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Documents linked automatically.
    pub auto_linked: usize,
    /// Suggestions enqueued for review.
    pub enqueued: usize,
    /// Documents marked skipped; future runs never resurface them.
    pub skipped: usize,
    /// Documents left unresolved this run (retried next run).
    pub unresolved: usize,
    /// Documents whose classification or persistence failed (retried next
    /// run).
    pub failed: usize,
    /// Classifier calls made.
    pub oracle_calls: usize,
    /// Wall-clock duration of the run in milliseconds.
    pub elapsed_ms: u64,
}
