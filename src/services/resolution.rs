//! The resolution pipeline.
//!
//! Pulls unresolved documents, walks them through the matcher tiers in
//! strictly escalating cost (explicit code, learned pattern, classifier),
//! and routes each result through the confidence gate. Per-document failures
//! are counted, not fatal; the run always completes and reports what it did.

use crate::llm::Classifier;
use crate::matching::{DeterministicMatcher, PatternMatcher, DETERMINISTIC_CONFIDENCE};
use crate::models::{
    Document, Entity, Link, LinkMethod, Resolution, RunSummary, Suggestion, SuggestionId,
    SuggestionStatus,
};
use crate::services::{gate_decide, GateOutcome};
use crate::storage::{DocumentSource, EntityCatalog, SqliteStore};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Results below this confidence are discarded; the document stays
/// unresolved rather than generating a noise suggestion.
pub const RESOLUTION_FLOOR: f64 = 0.2;

/// Orchestrates one resolution run end to end.
pub struct ResolutionService {
    store: Arc<SqliteStore>,
    source: Arc<dyn DocumentSource>,
    catalog: Arc<dyn EntityCatalog>,
    deterministic: DeterministicMatcher,
    patterns: PatternMatcher,
    classifier: Arc<dyn Classifier>,
    strict_review: bool,
    max_candidates: usize,
}

impl ResolutionService {
    /// Creates a resolution service over the given store, boundaries and
    /// classifier.
    #[must_use]
    pub fn new(
        store: Arc<SqliteStore>,
        source: Arc<dyn DocumentSource>,
        catalog: Arc<dyn EntityCatalog>,
        classifier: Arc<dyn Classifier>,
    ) -> Self {
        let deterministic = DeterministicMatcher::new(Arc::clone(&catalog));
        let patterns = PatternMatcher::new(Arc::clone(&store));
        Self {
            store,
            source,
            catalog,
            deterministic,
            patterns,
            classifier,
            strict_review: false,
            max_candidates: 20,
        }
    }

    /// Sets strict human review mode.
    #[must_use]
    pub const fn with_strict_review(mut self, strict: bool) -> Self {
        self.strict_review = strict;
        self
    }

    /// Sets the maximum number of candidate entities offered per classifier
    /// call.
    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates.max(1);
        self
    }

    /// Runs one resolution pass over up to `batch_size` unresolved
    /// documents.
    ///
    /// Cheap tiers run sequentially; documents they leave unresolved fan
    /// out to the classifier in parallel when `use_oracle` is set (the
    /// bulkhead bounds the actual concurrency). The run is idempotent:
    /// already-linked, pending and skipped documents are never re-fetched,
    /// and duplicate writes are absorbed by the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for a zero batch size, or an error
    /// if the document source itself fails. Per-document errors are counted
    /// in the summary instead.
    pub fn run_resolution(&self, batch_size: usize, use_oracle: bool) -> Result<RunSummary> {
        if batch_size == 0 {
            return Err(Error::InvalidInput("batch size must be at least 1".to_string()));
        }

        let started = Instant::now();
        let documents = self.source.fetch_unresolved(batch_size)?;
        tracing::info!(
            documents = documents.len(),
            use_oracle = use_oracle,
            "Starting resolution run"
        );

        let mut summary = RunSummary::default();
        let mut for_oracle = Vec::new();

        for document in &documents {
            match self.resolve_cheap(document) {
                Ok(Some(resolution)) => self.persist(&resolution, &mut summary),
                Ok(None) => for_oracle.push(document),
                Err(e) => {
                    tracing::warn!(document_id = %document.id, error = %e, "Matcher tier failed");
                    summary.failed += 1;
                },
            }
        }

        if use_oracle {
            self.run_oracle_tier(&for_oracle, &mut summary);
        } else {
            summary.unresolved += for_oracle.len();
        }

        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            auto_linked = summary.auto_linked,
            enqueued = summary.enqueued,
            skipped = summary.skipped,
            unresolved = summary.unresolved,
            failed = summary.failed,
            oracle_calls = summary.oracle_calls,
            elapsed_ms = summary.elapsed_ms,
            "Resolution run complete"
        );
        metrics::counter!("resolution_runs_total").increment(1);
        metrics::counter!("documents_auto_linked_total").increment(summary.auto_linked as u64);
        metrics::counter!("suggestions_enqueued_total").increment(summary.enqueued as u64);

        Ok(summary)
    }

    /// The two cheap tiers, in order. A deterministic hit short-circuits;
    /// otherwise the best pattern candidate above the floor wins.
    fn resolve_cheap(&self, document: &Document) -> Result<Option<Resolution>> {
        if let Some(code) = self.deterministic.matches(document)? {
            return Ok(Some(Resolution {
                document_id: document.id.clone(),
                entity_code: code.clone(),
                confidence: DETERMINISTIC_CONFIDENCE,
                method: LinkMethod::ExplicitCode,
                evidence: format!("explicit code {code} in document text"),
            }));
        }

        let candidates = self.patterns.matches(document)?;
        if let Some(best) = candidates.first() {
            if best.confidence >= RESOLUTION_FLOOR {
                return Ok(Some(Resolution {
                    document_id: document.id.clone(),
                    entity_code: best.entity_code.clone(),
                    confidence: best.confidence,
                    method: LinkMethod::LearnedPattern,
                    evidence: best.evidence.clone(),
                }));
            }
        }

        Ok(None)
    }

    /// Fans the remaining documents out to the classifier.
    ///
    /// Shortlists come from the catalog up front, while no worker holds the
    /// store; the scoped threads then only touch the classifier. A
    /// classifier error leaves the document unresolved for the next run,
    /// while a confident abstention writes a skip marker so the document is
    /// never re-billed.
    fn run_oracle_tier(&self, documents: &[&Document], summary: &mut RunSummary) {
        let mut inputs: Vec<(&Document, Vec<Entity>)> = Vec::with_capacity(documents.len());
        for document in documents {
            match self.catalog.candidate_shortlist(document, self.max_candidates) {
                Ok(candidates) if candidates.is_empty() => {
                    // the catalog may grow; retry next run
                    tracing::debug!(document_id = %document.id, "No candidates for classifier");
                    summary.unresolved += 1;
                },
                Ok(candidates) => inputs.push((*document, candidates)),
                Err(e) => {
                    tracing::warn!(document_id = %document.id, error = %e, "Shortlist failed");
                    summary.failed += 1;
                },
            }
        }

        let results: Vec<(&Document, Result<Option<crate::llm::Classification>>)> =
            std::thread::scope(|scope| {
                let handles: Vec<_> = inputs
                    .iter()
                    .map(|(document, candidates)| {
                        let classifier = Arc::clone(&self.classifier);
                        scope.spawn(move || classifier.classify(document, candidates))
                    })
                    .collect();

                inputs
                    .iter()
                    .zip(handles)
                    .map(|((document, _), handle)| {
                        let result = handle.join().unwrap_or_else(|_| {
                            Err(Error::OperationFailed {
                                operation: "oracle_classify".to_string(),
                                cause: "classifier worker panicked".to_string(),
                            })
                        });
                        (*document, result)
                    })
                    .collect()
            });

        summary.oracle_calls += results.len();

        for (document, result) in results {
            match result {
                Ok(Some(classification)) if classification.confidence >= RESOLUTION_FLOOR => {
                    let resolution = Resolution {
                        document_id: document.id.clone(),
                        entity_code: classification.entity_code,
                        confidence: classification.confidence,
                        method: LinkMethod::Oracle,
                        evidence: classification.rationale,
                    };
                    self.persist(&resolution, summary);
                },
                Ok(_) => {
                    tracing::debug!(document_id = %document.id, "Classifier abstained");
                    match self.store.mark_skipped(&document.id) {
                        Ok(()) => summary.skipped += 1,
                        Err(e) => {
                            tracing::warn!(
                                document_id = %document.id,
                                error = %e,
                                "Skip marker write failed"
                            );
                            summary.failed += 1;
                        },
                    }
                },
                Err(e) => {
                    // left unresolved; the next run retries it
                    tracing::warn!(document_id = %document.id, error = %e, "Classifier failed");
                    summary.failed += 1;
                },
            }
        }
    }

    /// Routes one resolution through the gate and persists the outcome.
    fn persist(&self, resolution: &Resolution, summary: &mut RunSummary) {
        let now = crate::current_timestamp();
        match gate_decide(resolution.confidence, resolution.method, self.strict_review) {
            GateOutcome::AutoApply => {
                let link = Link {
                    document_id: resolution.document_id.clone(),
                    entity_code: resolution.entity_code.clone(),
                    confidence: resolution.confidence,
                    method: resolution.method,
                    evidence: resolution.evidence.clone(),
                    created_at: now,
                };
                match self.store.insert_link(&link) {
                    Ok(true) => {
                        tracing::info!(
                            document_id = %resolution.document_id,
                            entity_code = %resolution.entity_code,
                            method = %resolution.method,
                            "Auto-linked document"
                        );
                        summary.auto_linked += 1;
                    },
                    Ok(false) => {
                        tracing::debug!(
                            document_id = %resolution.document_id,
                            "Document already linked"
                        );
                    },
                    Err(e) => {
                        tracing::warn!(
                            document_id = %resolution.document_id,
                            error = %e,
                            "Link write failed"
                        );
                        summary.failed += 1;
                    },
                }
            },
            GateOutcome::EnqueueForReview => {
                let suggestion = Suggestion {
                    id: SuggestionId::new(Uuid::new_v4().to_string()),
                    document_id: resolution.document_id.clone(),
                    proposed_entity_code: resolution.entity_code.clone(),
                    confidence: resolution.confidence,
                    method: resolution.method,
                    evidence: resolution.evidence.clone(),
                    status: SuggestionStatus::Pending,
                    created_at: now,
                    decided_at: None,
                };
                match self.store.insert_suggestion(&suggestion) {
                    Ok(true) => {
                        tracing::info!(
                            document_id = %resolution.document_id,
                            entity_code = %resolution.entity_code,
                            confidence = resolution.confidence,
                            "Enqueued suggestion for review"
                        );
                        summary.enqueued += 1;
                    },
                    Ok(false) => {
                        tracing::debug!(
                            document_id = %resolution.document_id,
                            "Pending suggestion already exists"
                        );
                    },
                    Err(e) => {
                        tracing::warn!(
                            document_id = %resolution.document_id,
                            error = %e,
                            "Suggestion write failed"
                        );
                        summary.failed += 1;
                    },
                }
            },
        }
    }
}
