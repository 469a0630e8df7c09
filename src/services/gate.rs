//! The confidence gate.
//!
//! Decides per resolution result whether to auto-apply the link or enqueue
//! it for human review. The two-tier policy is a hard design rule, not a
//! tunable default: deterministic evidence is trusted unconditionally,
//! probabilistic evidence is trusted conditionally, generative evidence is
//! never trusted unconditionally. False auto-links are costlier than a
//! one-click human confirmation.

use crate::models::LinkMethod;

/// Confidence at or above which probabilistic results may auto-apply.
pub const AUTO_APPLY_THRESHOLD: f64 = 0.95;

/// What to do with a resolution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Create the link directly.
    AutoApply,
    /// Enqueue a suggestion for human review.
    EnqueueForReview,
}

/// Decides whether a result auto-applies or goes to review.
///
/// Explicit-code results always auto-apply. Pattern and oracle results
/// auto-apply only at or above [`AUTO_APPLY_THRESHOLD`] and only when
/// strict human review mode is off. For a fixed method the outcome is a
/// non-decreasing function of confidence.
#[must_use]
pub fn decide(confidence: f64, method: LinkMethod, strict_review: bool) -> GateOutcome {
    match method {
        LinkMethod::ExplicitCode | LinkMethod::Manual => GateOutcome::AutoApply,
        LinkMethod::LearnedPattern | LinkMethod::Oracle => {
            if !strict_review && confidence >= AUTO_APPLY_THRESHOLD {
                GateOutcome::AutoApply
            } else {
                GateOutcome::EnqueueForReview
            }
        },
    }
}
