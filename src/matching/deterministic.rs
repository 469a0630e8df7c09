//! Explicit entity-code extraction.
//!
//! The highest-trust tier: scans document text for fixed-format entity codes
//! and validates them against the catalog. An explicit identifier is treated
//! as ground truth.

use crate::models::{Document, EntityCode};
use crate::storage::EntityCatalog;
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Confidence assigned to explicit-code matches.
pub const DETERMINISTIC_CONFIDENCE: f64 = 0.99;

/// Fixed-format entity codes: 2-5 uppercase letters, a hyphen, 2-5 digits.
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]{2,5}-\d{2,5})\b").expect("valid code regex"));

/// Matches documents containing an explicit, catalog-valid entity code.
pub struct DeterministicMatcher {
    catalog: Arc<dyn EntityCatalog>,
}

impl DeterministicMatcher {
    /// Creates a new deterministic matcher.
    #[must_use]
    pub fn new(catalog: Arc<dyn EntityCatalog>) -> Self {
        Self { catalog }
    }

    /// Returns the first catalog-valid explicit code in the document text,
    /// or `None`. Pure scan plus one catalog read per candidate code; no
    /// side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog lookup fails.
    pub fn matches(&self, document: &Document) -> Result<Option<EntityCode>> {
        let text = document.text();
        for capture in CODE_PATTERN.find_iter(&text) {
            let code = EntityCode::new(capture.as_str());
            if self.catalog.entity_by_code(&code)?.is_some() {
                return Ok(Some(code));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentId, Entity};
    use crate::Result;

    struct FixedCatalog(Vec<&'static str>);

    impl EntityCatalog for FixedCatalog {
        fn entity_by_code(&self, code: &EntityCode) -> Result<Option<Entity>> {
            Ok(self.0.contains(&code.as_str()).then(|| Entity {
                id: code.as_str().to_string(),
                canonical_code: code.clone(),
                display_name: String::new(),
            }))
        }

        fn candidate_shortlist(&self, _: &Document, _: usize) -> Result<Vec<Entity>> {
            Ok(vec![])
        }
    }

    fn doc(subject: &str, body: &str) -> Document {
        Document {
            id: DocumentId::new("doc_1"),
            origin_identifier: "a@b.com".to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn test_matches_code_in_subject() {
        let matcher = DeterministicMatcher::new(Arc::new(FixedCatalog(vec!["PRJ-042"])));
        let result = matcher.matches(&doc("Invoice for PRJ-042", "")).unwrap();
        assert_eq!(result, Some(EntityCode::new("PRJ-042")));
    }

    #[test]
    fn test_matches_code_in_body() {
        let matcher = DeterministicMatcher::new(Arc::new(FixedCatalog(vec!["ACC-17"])));
        let result = matcher
            .matches(&doc("Re: statement", "regarding account ACC-17 please"))
            .unwrap();
        assert_eq!(result, Some(EntityCode::new("ACC-17")));
    }

    #[test]
    fn test_skips_unknown_codes() {
        // A code-shaped token not in the catalog must not match
        let matcher = DeterministicMatcher::new(Arc::new(FixedCatalog(vec!["PRJ-042"])));
        let result = matcher.matches(&doc("About XYZ-999", "")).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_first_valid_code_wins() {
        let matcher = DeterministicMatcher::new(Arc::new(FixedCatalog(vec!["PRJ-042", "PRJ-043"])));
        let result = matcher
            .matches(&doc("XYZ-999 then PRJ-043 then PRJ-042", ""))
            .unwrap();
        assert_eq!(result, Some(EntityCode::new("PRJ-043")));
    }

    #[test]
    fn test_no_code_shaped_tokens() {
        let matcher = DeterministicMatcher::new(Arc::new(FixedCatalog(vec!["PRJ-042"])));
        let result = matcher.matches(&doc("lunch on friday?", "see you there")).unwrap();
        assert_eq!(result, None);
    }
}
