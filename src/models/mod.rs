//! Data models for corrlink.
//!
//! This module contains all the core data structures used throughout the system.

mod document;
mod entity;
mod link;
mod pattern;
mod resolution;
mod suggestion;

pub use document::{Document, DocumentId};
pub use entity::{Entity, EntityCode};
pub use link::{Link, LinkMethod};
pub use pattern::{LearnedPattern, PatternType};
pub use resolution::{Resolution, RunSummary};
pub use suggestion::{Decision, DecisionAction, Suggestion, SuggestionId, SuggestionStatus};
