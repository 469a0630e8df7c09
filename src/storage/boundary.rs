//! Boundaries to the externally-owned document and entity stores.
//!
//! The ingestion subsystem owns documents and the business-data subsystem
//! owns entities; corrlink consumes both through these traits. The default
//! implementations in [`super::SqliteStore`] read co-located tables in the
//! same database.

use crate::models::{Document, Entity, EntityCode};
use crate::Result;

/// Source of documents awaiting resolution.
pub trait DocumentSource: Send + Sync {
    /// Pulls a bounded batch of documents that have no link, no pending
    /// suggestion, and are not marked skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be queried.
    fn fetch_unresolved(&self, limit: usize) -> Result<Vec<Document>>;
}

/// Read-only lookup into the business entity catalog.
pub trait EntityCatalog: Send + Sync {
    /// Looks up an entity by canonical code.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be queried.
    fn entity_by_code(&self, code: &EntityCode) -> Result<Option<Entity>>;

    /// Returns a bounded shortlist of candidate entities for a document,
    /// used to keep the classifier's search space small and its answer
    /// verifiable.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be queried.
    fn candidate_shortlist(&self, document: &Document, limit: usize) -> Result<Vec<Entity>>;
}
