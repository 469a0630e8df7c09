//! The learning feedback loop.
//!
//! Translates review decisions into learned-pattern mutations. This service
//! is the single writer to the pattern store; matchers are read-only. All
//! confidence arithmetic lives here so the bounds have one implementation.

use crate::models::{
    Decision, DecisionAction, Document, EntityCode, LearnedPattern, PatternType, Suggestion,
};
use crate::storage::SqliteStore;
use crate::Result;
use std::sync::Arc;

/// Step factor moving confidence toward 1.0 on positive feedback.
pub const POSITIVE_STEP: f64 = 0.3;

/// Upper bound on learned confidence. A probabilistic tier never reaches
/// absolute certainty.
pub const CONFIDENCE_CAP: f64 = 0.99;

/// Multiplier applied on negative feedback.
pub const NEGATIVE_FACTOR: f64 = 0.6;

/// Starting confidence for a freshly learned pattern. Deliberately below
/// the auto-apply threshold so a new pattern passes review at least once.
pub const INITIAL_CONFIDENCE: f64 = 0.65;

/// Applies the bounded positive update: `c + (1 - c) * 0.3`, capped.
#[must_use]
pub fn reinforced_confidence(current: f64) -> f64 {
    ((1.0 - current).mul_add(POSITIVE_STEP, current)).min(CONFIDENCE_CAP)
}

/// Applies the bounded negative update: `c * 0.6`.
#[must_use]
pub fn discounted_confidence(current: f64) -> f64 {
    (current * NEGATIVE_FACTOR).clamp(0.0, 1.0)
}

/// Consumes decisions and updates the pattern store.
pub struct LearningService {
    store: Arc<SqliteStore>,
}

impl LearningService {
    /// Creates a new learning service.
    #[must_use]
    pub fn new(store: Arc<SqliteStore>) -> Self {
        Self { store }
    }

    /// Absorbs one decision into the pattern store.
    ///
    /// - `approve`: positive feedback for the proposed target.
    /// - `correct`: negative feedback for the proposed target, positive for
    ///   the corrected one.
    /// - `reject`: negative feedback for the proposed target.
    /// - `skip`: no pattern adjustment.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern store cannot be updated.
    pub fn absorb(
        &self,
        document: &Document,
        suggestion: &Suggestion,
        decision: &Decision,
    ) -> Result<()> {
        let sender = document.origin_identifier.to_lowercase();
        let domain = document.origin_domain();

        match decision.action {
            DecisionAction::Approve => {
                self.positive(&sender, domain.as_deref(), &suggestion.proposed_entity_code)?;
            },
            DecisionAction::Correct => {
                self.negative(&sender, domain.as_deref(), &suggestion.proposed_entity_code)?;
                if let Some(ref corrected) = decision.corrected_entity_code {
                    self.positive(&sender, domain.as_deref(), corrected)?;
                }
            },
            DecisionAction::Reject => {
                self.negative(&sender, domain.as_deref(), &suggestion.proposed_entity_code)?;
            },
            DecisionAction::Skip => {},
        }

        Ok(())
    }

    /// Positive feedback: reinforce the exact-sender pattern (creating it at
    /// [`INITIAL_CONFIDENCE`] if absent) and reinforce an existing domain
    /// pattern that corroborates the same target.
    fn positive(&self, sender: &str, domain: Option<&str>, target: &EntityCode) -> Result<()> {
        self.reinforce(PatternType::Sender, sender, target, true)?;
        if let Some(domain) = domain {
            self.reinforce(PatternType::Domain, domain, target, false)?;
        }
        Ok(())
    }

    /// Negative feedback: discount whichever patterns pointed at the target.
    /// Patterns are never deleted; a history of corrections is itself
    /// diagnostic data.
    fn negative(&self, sender: &str, domain: Option<&str>, target: &EntityCode) -> Result<()> {
        self.discount(PatternType::Sender, sender, target)?;
        if let Some(domain) = domain {
            self.discount(PatternType::Domain, domain, target)?;
        }
        Ok(())
    }

    fn reinforce(
        &self,
        pattern_type: PatternType,
        key: &str,
        target: &EntityCode,
        create_if_absent: bool,
    ) -> Result<()> {
        let now = crate::current_timestamp();
        match self.store.pattern(pattern_type, key, target)? {
            Some(existing) => {
                let updated = LearnedPattern {
                    confidence: reinforced_confidence(existing.confidence),
                    occurrences: existing.occurrences + 1,
                    last_used: now,
                    ..existing
                };
                tracing::debug!(
                    pattern_type = %pattern_type,
                    key = key,
                    target = %target,
                    confidence = updated.confidence,
                    "Reinforced pattern"
                );
                self.store.upsert_pattern(&updated)
            },
            None if create_if_absent => {
                let pattern = LearnedPattern {
                    pattern_type,
                    key: key.to_string(),
                    target_code: target.clone(),
                    confidence: INITIAL_CONFIDENCE,
                    occurrences: 1,
                    last_used: now,
                };
                tracing::info!(
                    pattern_type = %pattern_type,
                    key = key,
                    target = %target,
                    "Learned new pattern"
                );
                metrics::counter!("patterns_learned_total").increment(1);
                self.store.upsert_pattern(&pattern)
            },
            None => Ok(()),
        }
    }

    fn discount(&self, pattern_type: PatternType, key: &str, target: &EntityCode) -> Result<()> {
        if let Some(existing) = self.store.pattern(pattern_type, key, target)? {
            let updated = LearnedPattern {
                confidence: discounted_confidence(existing.confidence),
                last_used: crate::current_timestamp(),
                ..existing
            };
            tracing::debug!(
                pattern_type = %pattern_type,
                key = key,
                target = %target,
                confidence = updated.confidence,
                "Discounted pattern"
            );
            self.store.upsert_pattern(&updated)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, LinkMethod, SuggestionId, SuggestionStatus};
    use proptest::prelude::*;

    fn setup() -> (Arc<SqliteStore>, LearningService) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let learning = LearningService::new(Arc::clone(&store));
        (store, learning)
    }

    fn document() -> Document {
        Document {
            id: DocumentId::new("doc_1"),
            origin_identifier: "acme@corp.com".to_string(),
            subject: String::new(),
            body: String::new(),
            timestamp: 0,
        }
    }

    fn suggestion(code: &str) -> Suggestion {
        Suggestion {
            id: SuggestionId::new("sug_1"),
            document_id: DocumentId::new("doc_1"),
            proposed_entity_code: EntityCode::new(code),
            confidence: 0.8,
            method: LinkMethod::LearnedPattern,
            evidence: String::new(),
            status: SuggestionStatus::Pending,
            created_at: 0,
            decided_at: None,
        }
    }

    fn decision(action: DecisionAction, corrected: Option<&str>) -> Decision {
        Decision {
            suggestion_id: SuggestionId::new("sug_1"),
            action,
            corrected_entity_code: corrected.map(EntityCode::new),
            actor: "tester".to_string(),
            decided_at: 0,
        }
    }

    fn seed_sender_pattern(store: &SqliteStore, target: &str, confidence: f64) {
        store
            .upsert_pattern(&LearnedPattern {
                pattern_type: PatternType::Sender,
                key: "acme@corp.com".to_string(),
                target_code: EntityCode::new(target),
                confidence,
                occurrences: 1,
                last_used: 0,
            })
            .unwrap();
    }

    #[test]
    fn test_approve_reinforces_existing_pattern() {
        let (store, learning) = setup();
        seed_sender_pattern(&store, "PRJ-042", 0.8);

        learning
            .absorb(&document(), &suggestion("PRJ-042"), &decision(DecisionAction::Approve, None))
            .unwrap();

        let pattern = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-042"))
            .unwrap()
            .unwrap();
        assert!((pattern.confidence - 0.86).abs() < 1e-9);
        assert_eq!(pattern.occurrences, 2);
    }

    #[test]
    fn test_approve_creates_pattern_when_absent() {
        let (store, learning) = setup();

        learning
            .absorb(&document(), &suggestion("PRJ-042"), &decision(DecisionAction::Approve, None))
            .unwrap();

        let pattern = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-042"))
            .unwrap()
            .unwrap();
        assert!((pattern.confidence - INITIAL_CONFIDENCE).abs() < f64::EPSILON);
        assert_eq!(pattern.occurrences, 1);
    }

    #[test]
    fn test_correct_discounts_original_and_learns_corrected() {
        let (store, learning) = setup();
        seed_sender_pattern(&store, "PRJ-042", 0.8);

        learning
            .absorb(
                &document(),
                &suggestion("PRJ-042"),
                &decision(DecisionAction::Correct, Some("PRJ-099")),
            )
            .unwrap();

        let original = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-042"))
            .unwrap()
            .unwrap();
        assert!((original.confidence - 0.48).abs() < 1e-9);

        let corrected = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-099"))
            .unwrap()
            .unwrap();
        assert!((corrected.confidence - INITIAL_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reject_discounts_without_deleting() {
        let (store, learning) = setup();
        seed_sender_pattern(&store, "PRJ-042", 0.5);

        learning
            .absorb(&document(), &suggestion("PRJ-042"), &decision(DecisionAction::Reject, None))
            .unwrap();

        let pattern = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-042"))
            .unwrap()
            .unwrap();
        assert!((pattern.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_skip_leaves_patterns_untouched() {
        let (store, learning) = setup();
        seed_sender_pattern(&store, "PRJ-042", 0.8);

        learning
            .absorb(&document(), &suggestion("PRJ-042"), &decision(DecisionAction::Skip, None))
            .unwrap();

        let pattern = store
            .pattern(PatternType::Sender, "acme@corp.com", &EntityCode::new("PRJ-042"))
            .unwrap()
            .unwrap();
        assert!((pattern.confidence - 0.8).abs() < f64::EPSILON);
        assert_eq!(pattern.occurrences, 1);
    }

    #[test]
    fn test_repeated_approval_converges_to_cap() {
        let mut confidence = INITIAL_CONFIDENCE;
        let mut previous = 0.0;
        for _ in 0..50 {
            confidence = reinforced_confidence(confidence);
            // strictly increasing until the cap, then pinned there
            if previous < CONFIDENCE_CAP {
                assert!(confidence > previous);
            } else {
                assert!((confidence - CONFIDENCE_CAP).abs() < f64::EPSILON);
            }
            assert!(confidence <= CONFIDENCE_CAP);
            previous = confidence;
        }
        assert!((confidence - CONFIDENCE_CAP).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn reinforcement_is_bounded_and_increasing(c in 0.0f64..CONFIDENCE_CAP) {
            let updated = reinforced_confidence(c);
            prop_assert!(updated > c);
            prop_assert!(updated <= CONFIDENCE_CAP);
        }

        #[test]
        fn discount_is_bounded_and_decreasing(c in 0.0f64..=1.0) {
            let updated = discounted_confidence(c);
            prop_assert!(updated <= c);
            prop_assert!(updated >= 0.0);
        }
    }
}
