//! INSPIRE literature REST API search

use super::{render_fulltext_query, InspireRecord, SearchHit, SearchTool};
use crate::config::InspireConfig;
use crate::context::ContextMode;
use crate::errors::{AppError, Result};
use crate::http::build_client;
use async_trait::async_trait;
use serde::Deserialize;

const SERVICE: &str = "inspire_api";

/// Searches the public literature API with an `ft` OR query
pub struct InspireApiSearch {
    client: reqwest::Client,
    api_url: String,
    size: usize,
    timeout_ms: u64,
}

#[derive(Deserialize)]
struct ApiResponse {
    hits: ApiHits,
}

#[derive(Deserialize)]
struct ApiHits {
    #[serde(default)]
    hits: Vec<ApiHit>,
}

#[derive(Deserialize)]
struct ApiHit {
    #[serde(default)]
    metadata: InspireRecord,
}

impl InspireApiSearch {
    pub fn new(config: &InspireConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_secs, None, None)?,
            api_url: config.api_url.clone(),
            size: config.api_size,
            timeout_ms: config.timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl SearchTool for InspireApiSearch {
    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHit>> {
        let query = render_fulltext_query(terms);
        let size = self.size.to_string();

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", query.as_str()), ("size", size.as_str()), ("format", "json")])
            .send()
            .await
            .map_err(|e| AppError::from_transport(SERVICE, self.timeout_ms, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: SERVICE.to_string(),
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        let hits: Vec<SearchHit> = parsed
            .hits
            .hits
            .into_iter()
            .filter_map(|hit| hit.metadata.into_hit(Vec::new()))
            .collect();

        tracing::debug!(query = %query, results = hits.len(), "INSPIRE API search returned");
        Ok(hits)
    }

    fn context_mode(&self) -> ContextMode {
        ContextMode::Abstract
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_size_and_timeout() {
        let tool = InspireApiSearch::new(&InspireConfig::default()).unwrap();
        assert_eq!(tool.size, 10);
        assert_eq!(tool.timeout_ms, 30_000);
        assert_eq!(tool.context_mode(), ContextMode::Abstract);
    }
}
