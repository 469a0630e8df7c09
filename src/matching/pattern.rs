//! Learned-pattern lookups.
//!
//! Probabilistic tier: looks up the document's origin identifier (exact
//! sender first, then its domain) against the pattern store. Read-only —
//! usage counters are updated by the learning loop, never by lookups, so
//! matching stays idempotent.

use crate::models::{Document, EntityCode, PatternType};
use crate::storage::SqliteStore;
use crate::Result;
use std::sync::Arc;

/// Discount applied to domain-level matches relative to exact-sender
/// matches, reflecting their lower specificity.
pub const DOMAIN_DISCOUNT: f64 = 0.9;

/// A ranked pattern-tier candidate.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    /// The candidate entity.
    pub entity_code: EntityCode,
    /// Pattern confidence, discounted for domain-level keys.
    pub confidence: f64,
    /// Human-readable evidence naming the matched key.
    pub evidence: String,
}

/// Matches documents against learned sender and domain patterns.
pub struct PatternMatcher {
    store: Arc<SqliteStore>,
}

impl PatternMatcher {
    /// Creates a new pattern matcher.
    #[must_use]
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Returns ranked candidates for the document, most specific key first.
    ///
    /// Exact-sender patterns keep their stored confidence; domain patterns
    /// are discounted by [`DOMAIN_DISCOUNT`]. The combined list is sorted by
    /// confidence descending.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern store cannot be queried.
    pub fn matches(&self, document: &Document) -> Result<Vec<PatternMatch>> {
        let mut candidates = Vec::new();
        let sender = document.origin_identifier.to_lowercase();

        for pattern in self.store.patterns_for_key(PatternType::Sender, &sender)? {
            candidates.push(PatternMatch {
                entity_code: pattern.target_code,
                confidence: pattern.confidence,
                evidence: format!("sender pattern '{sender}'"),
            });
        }

        if let Some(domain) = document.origin_domain() {
            for pattern in self.store.patterns_for_key(PatternType::Domain, &domain)? {
                candidates.push(PatternMatch {
                    entity_code: pattern.target_code,
                    confidence: pattern.confidence * DOMAIN_DISCOUNT,
                    evidence: format!("domain pattern '{domain}'"),
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(candidates)
    }
}
