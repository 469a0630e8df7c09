//! Matching tiers of the resolution pipeline.
//!
//! Tier order is deterministic → pattern → classifier; the pipeline stops at
//! the first tier that produces a result above the floor.

mod deterministic;
mod pattern;

pub use deterministic::{DeterministicMatcher, DETERMINISTIC_CONFIDENCE};
pub use pattern::{PatternMatch, PatternMatcher, DOMAIN_DISCOUNT};
