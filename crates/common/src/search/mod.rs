//! Literature search tools
//!
//! Two interchangeable backends feed the search orchestrator:
//! - `InspireApiSearch`: the public literature REST API (titles + abstracts)
//! - `InspireFullTextSearch`: the OpenSearch cluster with highlighted
//!   full-text fragments
//!
//! Both normalize raw records into [`SearchHit`] at the deserialization
//! boundary so downstream formatting never deals with missing fields.

mod full_text;
mod inspire_api;

pub use full_text::{build_full_text_query, InspireFullTextSearch, HIGHLIGHT_FIELD};
pub use inspire_api::InspireApiSearch;

use crate::context::ContextMode;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Placeholder rendered for absent title/abstract/year/DOI values
pub const NOT_AVAILABLE: &str = "N/A";

/// One retrieved literature record, scoped to a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Stable INSPIRE identifier
    pub control_number: i64,

    pub title: String,

    pub abstract_text: String,

    /// Author full names in record order
    pub authors: Vec<String>,

    pub publication_year: Option<i32>,

    pub doi: Option<String>,

    /// Highlighted full-text fragments, empty outside highlight mode
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl SearchHit {
    /// Minimal hit with `N/A` metadata
    pub fn new(control_number: i64, title: impl Into<String>) -> Self {
        Self {
            control_number,
            title: title.into(),
            abstract_text: NOT_AVAILABLE.to_string(),
            authors: Vec::new(),
            publication_year: None,
            doi: None,
            highlights: Vec::new(),
        }
    }
}

/// Full-text search backend consumed by the search orchestrator
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Run an OR query over the expanded terms, returning hits in rank order
    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHit>>;

    /// How hits from this tool should be rendered into prompt context
    fn context_mode(&self) -> ContextMode;

    fn name(&self) -> &str;
}

/// Render expanded terms as an INSPIRE full-text query: `ft "a" OR ft "b"`
pub fn render_fulltext_query(terms: &[String]) -> String {
    terms
        .iter()
        .map(|term| format!("ft \"{}\"", term))
        .collect::<Vec<_>>()
        .join(" OR ")
}

// ============================================================================
// Raw INSPIRE record shape
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct InspireRecord {
    control_number: Option<i64>,
    #[serde(default)]
    titles: Vec<TitleEntry>,
    #[serde(default)]
    abstracts: Vec<ValueEntry>,
    #[serde(default)]
    authors: Vec<AuthorEntry>,
    #[serde(default)]
    publication_info: Vec<PublicationInfo>,
    #[serde(default)]
    dois: Vec<ValueEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValueEntry {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorEntry {
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct PublicationInfo {
    year: Option<i32>,
}

impl InspireRecord {
    /// Convert into a hit, or `None` when the record has no control number.
    ///
    /// A record without a control number cannot be cited, so it is dropped
    /// here rather than formatted with a placeholder identifier.
    pub(crate) fn into_hit(self, highlights: Vec<String>) -> Option<SearchHit> {
        let control_number = match self.control_number {
            Some(cn) => cn,
            None => {
                tracing::warn!("Skipping INSPIRE record without control_number");
                return None;
            }
        };

        let first_value = |entries: Vec<ValueEntry>| {
            entries.into_iter().next().and_then(|e| e.value)
        };

        Some(SearchHit {
            control_number,
            title: self
                .titles
                .into_iter()
                .next()
                .and_then(|t| t.title)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            abstract_text: first_value(self.abstracts)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            authors: self.authors.into_iter().map(|a| a.full_name).collect(),
            publication_year: self.publication_info.into_iter().next().and_then(|p| p.year),
            doi: first_value(self.dois),
            highlights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_fulltext_query() {
        let terms = vec!["black holes".to_string(), "event horizon".to_string()];
        assert_eq!(
            render_fulltext_query(&terms),
            r#"ft "black holes" OR ft "event horizon""#
        );
    }

    #[test]
    fn test_record_fallbacks_applied_at_boundary() {
        let record: InspireRecord = serde_json::from_value(json!({
            "control_number": 1234,
            "authors": [{"full_name": "Hawking, S.W."}, {}]
        }))
        .unwrap();

        let hit = record.into_hit(vec![]).unwrap();
        assert_eq!(hit.control_number, 1234);
        assert_eq!(hit.title, "N/A");
        assert_eq!(hit.abstract_text, "N/A");
        assert_eq!(hit.authors, vec!["Hawking, S.W.".to_string(), String::new()]);
        assert_eq!(hit.publication_year, None);
        assert_eq!(hit.doi, None);
    }

    #[test]
    fn test_record_full_metadata() {
        let record: InspireRecord = serde_json::from_value(json!({
            "control_number": 42,
            "titles": [{"title": "Particle creation by black holes"}, {"title": "ignored"}],
            "abstracts": [{"value": "Quantum effects near horizons."}],
            "publication_info": [{"year": 1975}],
            "dois": [{"value": "10.1007/BF02345020"}]
        }))
        .unwrap();

        let hit = record.into_hit(vec!["fragment".into()]).unwrap();
        assert_eq!(hit.title, "Particle creation by black holes");
        assert_eq!(hit.abstract_text, "Quantum effects near horizons.");
        assert_eq!(hit.publication_year, Some(1975));
        assert_eq!(hit.doi.as_deref(), Some("10.1007/BF02345020"));
        assert_eq!(hit.highlights.len(), 1);
    }

    #[test]
    fn test_record_without_control_number_is_skipped() {
        let record: InspireRecord = serde_json::from_value(json!({
            "titles": [{"title": "Orphan"}]
        }))
        .unwrap();
        assert!(record.into_hit(vec![]).is_none());
    }
}
