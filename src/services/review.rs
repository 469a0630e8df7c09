//! The human review surface.
//!
//! Lists pending suggestions and executes decisions: validate, finalize in
//! the store, then feed the learning loop. Every state transition goes
//! through [`SqliteStore::apply_decision`], so a suggestion is decided at
//! most once no matter how many reviewers race.

use crate::models::{
    Decision, DecisionAction, EntityCode, Link, LinkMethod, Suggestion, SuggestionId,
};
use crate::services::LearningService;
use crate::storage::{EntityCatalog, SqliteStore};
use crate::{Error, Result};
use std::sync::Arc;

/// Confidence recorded on links created by a human correction. High but not
/// 1.0; reviewers misclick too.
pub const MANUAL_LINK_CONFIDENCE: f64 = 0.95;

/// Counts for a bulk review pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkDecideSummary {
    /// Suggestions successfully moved to a terminal state.
    pub decided: usize,
    /// Suggestions that were already decided by someone else.
    pub conflicts: usize,
    /// Suggestions that failed for any other reason.
    pub failed: usize,
}

/// Executes review decisions against the suggestion queue.
pub struct ReviewService {
    store: Arc<SqliteStore>,
    catalog: Arc<dyn EntityCatalog>,
    learning: LearningService,
}

impl ReviewService {
    /// Creates a new review service.
    #[must_use]
    pub fn new(store: Arc<SqliteStore>, catalog: Arc<dyn EntityCatalog>) -> Self {
        let learning = LearningService::new(Arc::clone(&store));
        Self {
            store,
            catalog,
            learning,
        }
    }

    /// Returns pending suggestions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store query fails.
    pub fn list_pending(&self, limit: usize) -> Result<Vec<Suggestion>> {
        self.store.pending_suggestions(limit)
    }

    /// Applies one decision to a pending suggestion.
    ///
    /// Validation happens before any write: a correction must name an entity
    /// the catalog knows, and only corrections may carry one. The store then
    /// finalizes the suggestion, writes the link or skip marker in the same
    /// transaction, and records the decision. Learning feedback runs after
    /// commit; by then the decision is durable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown suggestion or a
    /// malformed decision, [`Error::Conflict`] if the suggestion is already
    /// terminal, and [`Error::UnknownEntity`] if a correction names an
    /// entity outside the catalog.
    pub fn decide(
        &self,
        suggestion_id: &SuggestionId,
        action: DecisionAction,
        corrected: Option<EntityCode>,
        actor: &str,
    ) -> Result<Decision> {
        let suggestion = self
            .store
            .suggestion(suggestion_id)?
            .ok_or_else(|| Error::InvalidInput(format!("no such suggestion: {suggestion_id}")))?;

        if suggestion.status.is_terminal() {
            return Err(Error::Conflict {
                suggestion_id: suggestion_id.as_str().to_string(),
                status: suggestion.status.as_str().to_string(),
            });
        }

        let corrected = match (action, corrected) {
            (DecisionAction::Correct, Some(code)) => {
                if self.catalog.entity_by_code(&code)?.is_none() {
                    return Err(Error::UnknownEntity(code.as_str().to_string()));
                }
                Some(code)
            },
            (DecisionAction::Correct, None) => {
                return Err(Error::InvalidInput(
                    "a correction requires an entity code".to_string(),
                ));
            },
            (_, Some(code)) => {
                return Err(Error::InvalidInput(format!(
                    "entity code '{code}' is only valid with a correction"
                )));
            },
            (_, None) => None,
        };

        let decision = Decision {
            suggestion_id: suggestion_id.clone(),
            action,
            corrected_entity_code: corrected,
            actor: actor.to_string(),
            decided_at: crate::current_timestamp(),
        };

        let link = self.link_for(&suggestion, &decision);
        let skip_document = matches!(action, DecisionAction::Skip).then(|| &suggestion.document_id);

        self.store.apply_decision(&decision, link.as_ref(), skip_document)?;

        tracing::info!(
            suggestion_id = %suggestion_id,
            action = %action,
            actor = actor,
            "Suggestion decided"
        );
        metrics::counter!("review_decisions_total", "action" => action.as_str()).increment(1);

        self.feed_learning(&suggestion, &decision);

        Ok(decision)
    }

    /// Applies the same action to a batch of suggestions.
    ///
    /// Conflicts and failures are counted rather than aborting the batch,
    /// so one already-decided suggestion does not block the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the action is a correction, which
    /// cannot be applied in bulk.
    pub fn bulk_decide(
        &self,
        suggestion_ids: &[SuggestionId],
        action: DecisionAction,
        actor: &str,
    ) -> Result<BulkDecideSummary> {
        if action == DecisionAction::Correct {
            return Err(Error::InvalidInput(
                "corrections must be made one at a time".to_string(),
            ));
        }

        let mut summary = BulkDecideSummary::default();
        for suggestion_id in suggestion_ids {
            match self.decide(suggestion_id, action, None, actor) {
                Ok(_) => summary.decided += 1,
                Err(Error::Conflict { status, .. }) => {
                    tracing::debug!(
                        suggestion_id = %suggestion_id,
                        status = status,
                        "Skipping already-decided suggestion"
                    );
                    summary.conflicts += 1;
                },
                Err(e) => {
                    tracing::warn!(
                        suggestion_id = %suggestion_id,
                        error = %e,
                        "Bulk decision failed"
                    );
                    summary.failed += 1;
                },
            }
        }
        Ok(summary)
    }

    /// The link a decision produces, if any. Approvals confirm the proposal
    /// as-is; corrections create a manual link that supersedes anything the
    /// pipeline wrote.
    fn link_for(&self, suggestion: &Suggestion, decision: &Decision) -> Option<Link> {
        match decision.action {
            DecisionAction::Approve => Some(Link {
                document_id: suggestion.document_id.clone(),
                entity_code: suggestion.proposed_entity_code.clone(),
                confidence: suggestion.confidence,
                method: suggestion.method,
                evidence: format!("{} (approved by {})", suggestion.evidence, decision.actor),
                created_at: decision.decided_at,
            }),
            DecisionAction::Correct => {
                decision.corrected_entity_code.as_ref().map(|code| Link {
                    document_id: suggestion.document_id.clone(),
                    entity_code: code.clone(),
                    confidence: MANUAL_LINK_CONFIDENCE,
                    method: LinkMethod::Manual,
                    evidence: format!("corrected by {}", decision.actor),
                    created_at: decision.decided_at,
                })
            },
            DecisionAction::Reject | DecisionAction::Skip => None,
        }
    }

    /// Feeds the decision to the learning loop. The decision is already
    /// durable, so a learning failure is logged and swallowed rather than
    /// surfaced as a review error.
    fn feed_learning(&self, suggestion: &Suggestion, decision: &Decision) {
        let document = match self.store.document(&suggestion.document_id) {
            Ok(Some(document)) => document,
            Ok(None) => {
                tracing::warn!(
                    document_id = %suggestion.document_id,
                    "Document missing from store; skipping learning feedback"
                );
                return;
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load document for learning feedback");
                return;
            },
        };

        if let Err(e) = self.learning.absorb(&document, suggestion, decision) {
            tracing::warn!(
                suggestion_id = %suggestion.id,
                error = %e,
                "Learning feedback failed"
            );
        }
    }
}
