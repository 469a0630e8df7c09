//! Business logic services.
//!
//! Services orchestrate the store, matchers and classifier, and provide the
//! high-level operations: resolution runs, review decisions, and learning.

mod gate;
mod learning;
mod resolution;
mod review;

pub use gate::{decide as gate_decide, GateOutcome, AUTO_APPLY_THRESHOLD};
pub use learning::{
    LearningService, CONFIDENCE_CAP, INITIAL_CONFIDENCE, NEGATIVE_FACTOR, POSITIVE_STEP,
};
pub use resolution::{ResolutionService, RESOLUTION_FLOOR};
pub use review::{BulkDecideSummary, ReviewService, MANUAL_LINK_CONFIDENCE};
