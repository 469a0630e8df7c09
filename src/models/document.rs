//! Document types and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new document ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An inbound unit of correspondence to be associated with a business entity.
///
/// Documents are immutable once ingested and owned by the ingestion
/// subsystem; corrlink only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier.
    pub id: DocumentId,
    /// Origin identifier, typically the sender address.
    pub origin_identifier: String,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
    /// Ingestion timestamp (Unix epoch seconds).
    pub timestamp: u64,
}

impl Document {
    /// Returns the domain-level generalization of the origin identifier,
    /// i.e. the part after `@`, lowercased.
    ///
    /// Returns `None` when the origin has no `@` or an empty domain part.
    #[must_use]
    pub fn origin_domain(&self) -> Option<String> {
        let (_, domain) = self.origin_identifier.rsplit_once('@')?;
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_lowercase())
        }
    }

    /// Returns subject and body joined for text scanning.
    #[must_use]
    pub fn text(&self) -> String {
        format!("{}\n{}", self.subject, self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(origin: &str) -> Document {
        Document {
            id: DocumentId::new("doc_1"),
            origin_identifier: origin.to_string(),
            subject: "Re: proposal".to_string(),
            body: "See attached.".to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_origin_domain() {
        assert_eq!(doc("acme@corp.com").origin_domain(), Some("corp.com".to_string()));
        assert_eq!(doc("ACME@CORP.COM").origin_domain(), Some("corp.com".to_string()));
        assert_eq!(doc("no-at-sign").origin_domain(), None);
        assert_eq!(doc("trailing@").origin_domain(), None);
    }

    #[test]
    fn test_text_joins_subject_and_body() {
        let text = doc("a@b.c").text();
        assert!(text.contains("Re: proposal"));
        assert!(text.contains("See attached."));
    }
}
