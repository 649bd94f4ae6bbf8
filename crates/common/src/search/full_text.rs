//! Highlighted full-text search against the INSPIRE OpenSearch cluster

use super::{InspireRecord, SearchHit, SearchTool};
use crate::config::InspireConfig;
use crate::context::ContextMode;
use crate::errors::{AppError, Result};
use crate::http::build_client;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

const SERVICE: &str = "inspire_opensearch";

/// Field holding extracted PDF text; highlights are requested on it
pub const HIGHLIGHT_FIELD: &str = "documents.attachment.content";

/// Build the search body: one flat `should` list with fixed filters.
///
/// Only literature records carrying an arXiv cross-reference are eligible,
/// since those are the ones with attached full text.
pub fn build_full_text_query(terms: &[String], size: usize) -> Value {
    let should: Vec<Value> = terms
        .iter()
        .map(|term| json!({ "match_phrase": { HIGHLIGHT_FIELD: term } }))
        .collect();

    json!({
        "query": {
            "bool": {
                "should": should,
                "minimum_should_match": 1,
                "filter": [
                    { "match_all": {} },
                    { "terms": { "_collections": ["Literature"] } },
                    { "exists": { "field": "arxiv_eprints" } }
                ]
            }
        },
        "size": size,
        "highlight": {
            "fields": {
                HIGHLIGHT_FIELD: {
                    "fragment_size": 1000,
                    "number_of_fragments": 3,
                    "order": "score",
                    "type": "fvh",
                    "pre_tags": ["<em>"],
                    "post_tags": ["</em>"],
                    "boundary_scanner": "sentence",
                    "boundary_scanner_locale": "en-US"
                }
            }
        }
    })
}

/// OpenSearch-backed search returning highlight fragments per hit
pub struct InspireFullTextSearch {
    client: reqwest::Client,
    search_url: String,
    username: Option<String>,
    password: Option<String>,
    size: usize,
    timeout_ms: u64,
}

#[derive(Deserialize)]
struct OsResponse {
    hits: OsHits,
}

#[derive(Deserialize)]
struct OsHits {
    #[serde(default)]
    hits: Vec<OsHit>,
}

#[derive(Deserialize)]
struct OsHit {
    #[serde(rename = "_source", default)]
    source: InspireRecord,
    #[serde(default)]
    highlight: HashMap<String, Vec<String>>,
}

impl InspireFullTextSearch {
    pub fn new(config: &InspireConfig) -> Result<Self> {
        let base = config.opensearch_url.as_deref().ok_or_else(|| AppError::Configuration {
            message: "inspire.opensearch_url is required for full-text search".to_string(),
        })?;

        Ok(Self {
            client: build_client(config.timeout_secs, None, None)?,
            search_url: format!(
                "{}/{}/_search",
                base.trim_end_matches('/'),
                config.opensearch_index
            ),
            username: config.opensearch_username.clone(),
            password: config.opensearch_password.clone(),
            size: config.highlight_size,
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    /// Execute the query for `size` hits and return the cluster's raw JSON response
    pub async fn search_raw(&self, terms: &[String], size: usize) -> Result<Value> {
        let body = build_full_text_query(terms, size);

        let mut request = self.client.post(&self.search_url).json(&body);
        if let Some(ref user) = self.username {
            request = request.basic_auth(user, self.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::from_transport(SERVICE, self.timeout_ms, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: SERVICE.to_string(),
                message: format!("Search error {}: {}", status, body),
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))
    }
}

/// Normalize a raw OpenSearch response into hits with highlights attached
pub(crate) fn parse_hits(raw: Value) -> Result<Vec<SearchHit>> {
    let parsed: OsResponse =
        serde_json::from_value(raw).map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

    Ok(parsed
        .hits
        .hits
        .into_iter()
        .filter_map(|mut hit| {
            let highlights = hit.highlight.remove(HIGHLIGHT_FIELD).unwrap_or_default();
            hit.source.into_hit(highlights)
        })
        .collect())
}

#[async_trait]
impl SearchTool for InspireFullTextSearch {
    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHit>> {
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let raw = self.search_raw(terms, self.size).await?;
        let hits = parse_hits(raw)?;

        tracing::debug!(terms = terms.len(), results = hits.len(), "Full-text search returned");
        Ok(hits)
    }

    fn context_mode(&self) -> ContextMode {
        ContextMode::Highlight
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_flat_should_list() {
        let terms = vec!["dark matter".to_string(), "WIMP".to_string(), "axion".to_string()];
        let body = build_full_text_query(&terms, 5);

        let should = body["query"]["bool"]["should"].as_array().unwrap();
        assert_eq!(should.len(), 3);
        assert_eq!(should[1]["match_phrase"][HIGHLIGHT_FIELD], "WIMP");
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
        assert_eq!(body["size"], 5);

        let filters = body["query"]["bool"]["filter"].as_array().unwrap();
        assert_eq!(filters[2]["exists"]["field"], "arxiv_eprints");
    }

    #[test]
    fn test_highlight_settings() {
        let body = build_full_text_query(&["qcd".to_string()], 5);
        let field = &body["highlight"]["fields"][HIGHLIGHT_FIELD];
        assert_eq!(field["fragment_size"], 1000);
        assert_eq!(field["number_of_fragments"], 3);
        assert_eq!(field["boundary_scanner"], "sentence");
    }

    #[test]
    fn test_parse_hits_attaches_highlights() {
        let raw = json!({
            "hits": {
                "hits": [
                    {
                        "_source": { "control_number": 1, "titles": [{"title": "A"}] },
                        "highlight": { HIGHLIGHT_FIELD: ["first <em>match</em>", "second"] }
                    },
                    {
                        "_source": { "control_number": 2, "titles": [{"title": "B"}] }
                    },
                    {
                        "_source": { "titles": [{"title": "no id"}] }
                    }
                ]
            }
        });

        let hits = parse_hits(raw).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].highlights.len(), 2);
        assert!(hits[1].highlights.is_empty());
    }

    #[test]
    fn test_parse_hits_rejects_unexpected_shape() {
        let err = parse_hits(json!({ "error": "index missing" })).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[test]
    fn test_new_requires_cluster_url() {
        let err = InspireFullTextSearch::new(&InspireConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }

    #[test]
    fn test_new_builds_search_url() {
        let config = InspireConfig {
            opensearch_url: Some("https://os.inspirehep.net/".to_string()),
            ..InspireConfig::default()
        };
        let tool = InspireFullTextSearch::new(&config).unwrap();

        assert_eq!(tool.search_url, "https://os.inspirehep.net/records-hep/_search");
        assert_eq!(tool.size, 5);
    }
}
