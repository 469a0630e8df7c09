//! End-to-end pipeline tests.
//!
//! Exercises the full loop against a real on-disk store: resolution runs
//! across all three tiers, the confidence gate, review decisions, the
//! learning feedback they produce, and the behavior of repeat runs.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use corrlink::llm::Classification;
use corrlink::services::{ReviewService, AUTO_APPLY_THRESHOLD};
use corrlink::storage::{DocumentSource, EntityCatalog, SqliteStore};
use corrlink::{
    Classifier, DecisionAction, Document, DocumentId, Entity, EntityCode, LinkMethod,
    ResolutionService, Result, SuggestionStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// A classifier returning a fixed answer and counting its calls.
struct ScriptedClassifier {
    answer: Option<Classification>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    fn new(answer: Option<Classification>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(&self, _: &Document, _: &[Entity]) -> Result<Option<Classification>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

/// A classifier whose backend is down; every call errors.
struct UnavailableClassifier {
    calls: AtomicUsize,
}

impl UnavailableClassifier {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Classifier for UnavailableClassifier {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn classify(&self, _: &Document, _: &[Entity]) -> Result<Option<Classification>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(corrlink::Error::OperationFailed {
            operation: "oracle_request".to_string(),
            cause: "connection refused".to_string(),
        })
    }
}

fn oracle_answer(code: &str, confidence: f64) -> Option<Classification> {
    Some(Classification {
        entity_code: EntityCode::new(code),
        confidence,
        rationale: "the subject names that engagement".to_string(),
    })
}

fn open_store(temp_dir: &TempDir) -> Arc<SqliteStore> {
    let store =
        Arc::new(SqliteStore::open(temp_dir.path().join("corrlink.db")).expect("open store"));
    for (id, code, name) in [
        ("ent_1", "PRJ-042", "Acme Warehouse Rollout"),
        ("ent_2", "PRJ-099", "Acme Support Retainer"),
        ("ent_3", "ACC-7001", "Globex Receivables"),
    ] {
        store
            .insert_entity(&Entity {
                id: id.to_string(),
                canonical_code: EntityCode::new(code),
                display_name: name.to_string(),
            })
            .expect("insert entity");
    }
    store
}

fn add_document(store: &SqliteStore, id: &str, origin: &str, subject: &str, body: &str) {
    store
        .insert_document(&Document {
            id: DocumentId::new(id),
            origin_identifier: origin.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp: 1_700_000_000,
        })
        .expect("insert document");
}

fn resolution_service(
    store: &Arc<SqliteStore>,
    classifier: Arc<dyn Classifier>,
) -> ResolutionService {
    ResolutionService::new(
        Arc::clone(store),
        Arc::clone(store) as Arc<dyn DocumentSource>,
        Arc::clone(store) as Arc<dyn EntityCatalog>,
        classifier,
    )
}

fn review_service(store: &Arc<SqliteStore>) -> ReviewService {
    ReviewService::new(Arc::clone(store), Arc::clone(store) as Arc<dyn EntityCatalog>)
}

// ============================================================================
// Tier precedence
// ============================================================================

#[test]
fn explicit_code_wins_without_consulting_cheaper_evidence_or_oracle() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(
        &store,
        "doc_1",
        "billing@acme.com",
        "Invoice for PRJ-042",
        "Payment due in 30 days.",
    );
    // A strong conflicting pattern must not outrank the explicit code
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-099"),
            confidence: 0.98,
            occurrences: 20,
            last_used: 0,
        })
        .unwrap();

    let classifier = Arc::new(ScriptedClassifier::new(oracle_answer("PRJ-099", 0.9)));
    let service = resolution_service(&store, Arc::clone(&classifier) as Arc<dyn Classifier>);

    let summary = service.run_resolution(10, true).unwrap();
    assert_eq!(summary.auto_linked, 1);
    assert_eq!(classifier.call_count(), 0);

    let link = store
        .link_for_document(&DocumentId::new("doc_1"))
        .unwrap()
        .expect("link created");
    assert_eq!(link.entity_code.as_str(), "PRJ-042");
    assert_eq!(link.method, LinkMethod::ExplicitCode);
}

#[test]
fn oracle_runs_only_when_cheaper_tiers_abstain() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(
        &store,
        "doc_pattern",
        "billing@acme.com",
        "Monthly invoice",
        "",
    );
    add_document(
        &store,
        "doc_oracle",
        "newcontact@globex.com",
        "Question about the Globex Receivables account",
        "",
    );
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.7,
            occurrences: 3,
            last_used: 0,
        })
        .unwrap();

    let classifier = Arc::new(ScriptedClassifier::new(oracle_answer("ACC-7001", 0.85)));
    let service = resolution_service(&store, Arc::clone(&classifier) as Arc<dyn Classifier>);

    let summary = service.run_resolution(10, true).unwrap();
    assert_eq!(classifier.call_count(), 1);
    assert_eq!(summary.oracle_calls, 1);
    assert_eq!(summary.enqueued, 2);

    let pending = store.pending_suggestions(10).unwrap();
    let methods: Vec<LinkMethod> = pending.iter().map(|s| s.method).collect();
    assert!(methods.contains(&LinkMethod::LearnedPattern));
    assert!(methods.contains(&LinkMethod::Oracle));
}

// ============================================================================
// Gate behavior
// ============================================================================

#[test]
fn pattern_confidence_straddling_the_threshold_splits_auto_and_queue() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_high", "trusted@acme.com", "weekly report", "");
    add_document(&store, "doc_low", "new@acme.org", "weekly report", "");
    for (key, code, confidence) in [
        ("trusted@acme.com", "PRJ-042", AUTO_APPLY_THRESHOLD + 0.01),
        ("new@acme.org", "PRJ-099", AUTO_APPLY_THRESHOLD - 0.10),
    ] {
        store
            .upsert_pattern(&corrlink::LearnedPattern {
                pattern_type: corrlink::PatternType::Sender,
                key: key.to_string(),
                target_code: EntityCode::new(code),
                confidence,
                occurrences: 5,
                last_used: 0,
            })
            .unwrap();
    }

    let service = resolution_service(&store, Arc::new(ScriptedClassifier::new(None)));
    let summary = service.run_resolution(10, false).unwrap();

    assert_eq!(summary.auto_linked, 1);
    assert_eq!(summary.enqueued, 1);
    assert!(store
        .link_for_document(&DocumentId::new("doc_high"))
        .unwrap()
        .is_some());
    assert!(store
        .link_for_document(&DocumentId::new("doc_low"))
        .unwrap()
        .is_none());
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn rerunning_resolution_creates_no_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_1", "a@b.com", "Re: PRJ-042 kickoff", "");
    add_document(&store, "doc_2", "billing@acme.com", "Invoice", "");
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-099"),
            confidence: 0.7,
            occurrences: 2,
            last_used: 0,
        })
        .unwrap();

    let service = resolution_service(&store, Arc::new(ScriptedClassifier::new(None)));

    let first = service.run_resolution(10, false).unwrap();
    assert_eq!(first.auto_linked, 1);
    assert_eq!(first.enqueued, 1);

    for _ in 0..3 {
        let again = service.run_resolution(10, false).unwrap();
        assert_eq!(again.auto_linked, 0);
        assert_eq!(again.enqueued, 0);
    }

    assert_eq!(store.pending_suggestions(10).unwrap().len(), 1);
    assert_eq!(store.status().unwrap().links, 1);
}

#[test]
fn skipped_documents_are_never_refetched() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_1", "billing@acme.com", "Invoice", "");
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.7,
            occurrences: 2,
            last_used: 0,
        })
        .unwrap();

    let service = resolution_service(&store, Arc::new(ScriptedClassifier::new(None)));
    service.run_resolution(10, false).unwrap();

    let review = review_service(&store);
    let pending = store.pending_suggestions(10).unwrap();
    review
        .decide(&pending[0].id, DecisionAction::Skip, None, "reviewer")
        .unwrap();

    assert!(store.fetch_unresolved(10).unwrap().is_empty());
    let again = service.run_resolution(10, false).unwrap();
    assert_eq!(again.enqueued, 0);
}

// ============================================================================
// Oracle failure and abstention
// ============================================================================

#[test]
fn oracle_failure_leaves_no_trace_and_the_document_is_retried() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(
        &store,
        "doc_1",
        "newcontact@globex.com",
        "Question about the Globex Receivables account",
        "",
    );

    let down = Arc::new(UnavailableClassifier::new());
    let service = resolution_service(&store, Arc::clone(&down) as Arc<dyn Classifier>);

    let summary = service.run_resolution(10, true).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.auto_linked, 0);
    assert_eq!(summary.enqueued, 0);
    assert_eq!(down.calls.load(Ordering::SeqCst), 1);

    // No link, no suggestion, no skip marker; the failure left no state.
    assert!(store
        .link_for_document(&DocumentId::new("doc_1"))
        .unwrap()
        .is_none());
    assert!(store.pending_suggestions(10).unwrap().is_empty());
    assert_eq!(store.fetch_unresolved(10).unwrap().len(), 1);

    // Once the backend recovers, the same document resolves normally.
    let recovered = resolution_service(
        &store,
        Arc::new(ScriptedClassifier::new(oracle_answer("ACC-7001", 0.85))),
    );
    let retry = recovered.run_resolution(10, true).unwrap();
    assert_eq!(retry.enqueued, 1);
}

#[test]
fn confident_abstention_is_skipped_not_reclassified_every_run() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_noise", "newsletter@vendor.com", "Globex weekly digest", "");

    let classifier = Arc::new(ScriptedClassifier::new(None));
    let service = resolution_service(&store, Arc::clone(&classifier) as Arc<dyn Classifier>);

    let first = service.run_resolution(10, true).unwrap();
    assert_eq!(first.skipped, 1);

    for _ in 0..4 {
        service.run_resolution(10, true).unwrap();
    }
    assert_eq!(classifier.call_count(), 1);
    assert!(store.fetch_unresolved(10).unwrap().is_empty());
    assert_eq!(store.status().unwrap().skipped_documents, 1);
}

// ============================================================================
// Review decisions are exactly-once
// ============================================================================

#[test]
fn second_decision_on_the_same_suggestion_is_rejected_and_state_stands() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_1", "billing@acme.com", "Invoice", "");
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.7,
            occurrences: 2,
            last_used: 0,
        })
        .unwrap();
    resolution_service(&store, Arc::new(ScriptedClassifier::new(None)))
        .run_resolution(10, false)
        .unwrap();

    let review = review_service(&store);
    let suggestion_id = store.pending_suggestions(10).unwrap()[0].id.clone();

    review
        .decide(&suggestion_id, DecisionAction::Approve, None, "alice")
        .unwrap();
    let err = review
        .decide(
            &suggestion_id,
            DecisionAction::Correct,
            Some(EntityCode::new("PRJ-099")),
            "bob",
        )
        .unwrap_err();
    assert!(matches!(err, corrlink::Error::Conflict { .. }));

    // Alice's approval stands: the link still points at the proposal
    let link = store
        .link_for_document(&DocumentId::new("doc_1"))
        .unwrap()
        .unwrap();
    assert_eq!(link.entity_code.as_str(), "PRJ-042");
    let suggestion = store.suggestion(&suggestion_id).unwrap().unwrap();
    assert_eq!(suggestion.status, SuggestionStatus::Approved);
}

#[test]
fn correction_supersedes_and_records_a_manual_link() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    add_document(&store, "doc_1", "billing@acme.com", "Invoice", "");
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.7,
            occurrences: 2,
            last_used: 0,
        })
        .unwrap();
    resolution_service(&store, Arc::new(ScriptedClassifier::new(None)))
        .run_resolution(10, false)
        .unwrap();

    let review = review_service(&store);
    let suggestion_id = store.pending_suggestions(10).unwrap()[0].id.clone();
    review
        .decide(
            &suggestion_id,
            DecisionAction::Correct,
            Some(EntityCode::new("PRJ-099")),
            "alice",
        )
        .unwrap();

    let link = store
        .link_for_document(&DocumentId::new("doc_1"))
        .unwrap()
        .unwrap();
    assert_eq!(link.entity_code.as_str(), "PRJ-099");
    assert_eq!(link.method, LinkMethod::Manual);
}

// ============================================================================
// Learning convergence
// ============================================================================

#[test]
fn repeated_approvals_eventually_cross_the_auto_apply_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    let service = resolution_service(&store, Arc::new(ScriptedClassifier::new(None)));
    let review = review_service(&store);

    // A freshly learned pattern starts well below the threshold.
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.65,
            occurrences: 1,
            last_used: 0,
        })
        .unwrap();

    // Feed documents from the same sender, approving each suggestion, until
    // the learned pattern is strong enough to auto-apply.
    let mut auto_linked_at = None;
    for round in 0..10 {
        let doc_id = format!("doc_{round}");
        add_document(&store, &doc_id, "billing@acme.com", "Monthly invoice", "");

        let summary = service.run_resolution(10, false).unwrap();
        if summary.auto_linked == 1 {
            auto_linked_at = Some(round);
            break;
        }
        assert_eq!(summary.enqueued, 1, "round {round} should enqueue");

        let pending = store.pending_suggestions(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].proposed_entity_code.as_str(), "PRJ-042");
        review
            .decide(&pending[0].id, DecisionAction::Approve, None, "reviewer")
            .unwrap();
    }

    let rounds = auto_linked_at.expect("pattern should reach auto-apply within ten rounds");
    assert!(rounds >= 1, "a below-threshold pattern must pass review first");

    let pattern = store
        .pattern(
            corrlink::PatternType::Sender,
            "billing@acme.com",
            &EntityCode::new("PRJ-042"),
        )
        .unwrap()
        .unwrap();
    assert!(pattern.confidence >= AUTO_APPLY_THRESHOLD);
}

#[test]
fn rejection_weakens_a_pattern_until_it_no_longer_fires_confidently() {
    let temp_dir = TempDir::new().unwrap();
    let store = open_store(&temp_dir);
    store
        .upsert_pattern(&corrlink::LearnedPattern {
            pattern_type: corrlink::PatternType::Sender,
            key: "billing@acme.com".to_string(),
            target_code: EntityCode::new("PRJ-042"),
            confidence: 0.96,
            occurrences: 8,
            last_used: 0,
        })
        .unwrap();
    let service = resolution_service(&store, Arc::new(ScriptedClassifier::new(None)));
    let review = review_service(&store);

    // First document auto-links off the strong pattern.
    add_document(&store, "doc_1", "billing@acme.com", "Invoice", "");
    let first = service.run_resolution(10, false).unwrap();
    assert_eq!(first.auto_linked, 1);

    // The relationship changed; enqueue-and-reject drives the pattern down.
    add_document(&store, "doc_2", "billing@acme.com", "Invoice", "");
    // Force review mode off is default; pattern is still strong, so remove
    // the first link's influence by rejecting through the queue instead.
    let strict_service = ResolutionService::new(
        Arc::clone(&store),
        Arc::clone(&store) as Arc<dyn DocumentSource>,
        Arc::clone(&store) as Arc<dyn EntityCatalog>,
        Arc::new(ScriptedClassifier::new(None)),
    )
    .with_strict_review(true);
    strict_service.run_resolution(10, false).unwrap();

    let pending = store.pending_suggestions(10).unwrap();
    assert_eq!(pending.len(), 1);
    review
        .decide(&pending[0].id, DecisionAction::Reject, None, "reviewer")
        .unwrap();

    let pattern = store
        .pattern(
            corrlink::PatternType::Sender,
            "billing@acme.com",
            &EntityCode::new("PRJ-042"),
        )
        .unwrap()
        .unwrap();
    assert!(pattern.confidence < AUTO_APPLY_THRESHOLD);
}

// ============================================================================
// Durability
// ============================================================================

#[test]
fn queue_and_links_survive_reopening_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("corrlink.db");

    {
        let store = Arc::new(SqliteStore::open(&db_path).unwrap());
        store
            .insert_entity(&Entity {
                id: "ent_1".to_string(),
                canonical_code: EntityCode::new("PRJ-042"),
                display_name: "Acme Rollout".to_string(),
            })
            .unwrap();
        add_document(&store, "doc_1", "a@b.com", "Re: PRJ-042", "");
        add_document(&store, "doc_2", "billing@acme.com", "Invoice", "");
        store
            .upsert_pattern(&corrlink::LearnedPattern {
                pattern_type: corrlink::PatternType::Sender,
                key: "billing@acme.com".to_string(),
                target_code: EntityCode::new("PRJ-042"),
                confidence: 0.7,
                occurrences: 2,
                last_used: 0,
            })
            .unwrap();
        resolution_service(&store, Arc::new(ScriptedClassifier::new(None)))
            .run_resolution(10, false)
            .unwrap();
    }

    let reopened = Arc::new(SqliteStore::open(&db_path).unwrap());
    let status = reopened.status().unwrap();
    assert_eq!(status.links, 1);
    assert_eq!(status.pending_suggestions, 1);

    // The queue is still actionable after the restart.
    let review = review_service(&reopened);
    let pending = reopened.pending_suggestions(10).unwrap();
    review
        .decide(&pending[0].id, DecisionAction::Approve, None, "reviewer")
        .unwrap();
    assert_eq!(reopened.status().unwrap().links, 2);
}
