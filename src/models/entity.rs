//! Entity types and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical code identifying a business entity, e.g. `PRJ-042`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCode(String);

impl EntityCode {
    /// Creates a new entity code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A business record (project, proposal, account) that documents can be
/// linked to.
///
/// Owned by the business-data subsystem; read-only from corrlink's
/// perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Internal identifier.
    pub id: String,
    /// Canonical code.
    pub canonical_code: EntityCode,
    /// Human-readable name.
    pub display_name: String,
}
