//! Rerank API client

use super::{RankedDocument, RetrievedChunk};
use crate::config::RerankerConfig;
use crate::errors::{AppError, Result};
use crate::http::build_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "reranker";

/// Score for one input document, `index` points into the request list
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RerankResult {
    pub index: usize,
    pub relevance_score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `documents` against `query`, best first, at most `top_n` results
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>>;
}

/// Jina-style `/rerank` endpoint client
pub struct HttpReranker {
    client: reqwest::Client,
    url: String,
    model: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    documents: &'a [String],
    model: &'a str,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

impl HttpReranker {
    pub fn new(config: &RerankerConfig) -> Result<Self> {
        let client = build_client(
            config.timeout_secs,
            config.api_key.as_deref(),
            config.host_header.as_deref(),
        )?;

        Ok(Self {
            client,
            url: format!("{}/v1/rerank", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            timeout_ms: config.timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let request = RerankRequest {
            query,
            documents,
            model: &self.model,
            top_n,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
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

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        Ok(parsed.results)
    }
}

/// Order chunks by rerank results, highest score first.
///
/// Result indices outside `chunks` are a malformed response.
pub fn apply_rerank(
    chunks: Vec<RetrievedChunk>,
    mut results: Vec<RerankResult>,
    top_n: usize,
) -> Result<Vec<RankedDocument>> {
    results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    results.truncate(top_n);

    results
        .into_iter()
        .map(|result| {
            let chunk = chunks.get(result.index).ok_or_else(|| {
                AppError::malformed(
                    SERVICE,
                    format!("result index {} out of {} documents", result.index, chunks.len()),
                )
            })?;
            Ok(RankedDocument {
                text: chunk.text.clone(),
                control_number: chunk.control_number,
                relevance_score: result.relevance_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks() -> Vec<RetrievedChunk> {
        ["a", "b", "c"]
            .iter()
            .enumerate()
            .map(|(i, t)| RetrievedChunk {
                text: t.to_string(),
                control_number: Some(i as i64),
            })
            .collect()
    }

    fn result(index: usize, relevance_score: f32) -> RerankResult {
        RerankResult { index, relevance_score }
    }

    #[test]
    fn test_apply_rerank_orders_by_score() {
        let ranked = apply_rerank(chunks(), vec![result(0, 0.1), result(2, 0.9), result(1, 0.5)], 10)
            .unwrap();

        let texts: Vec<_> = ranked.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "b", "a"]);
        assert_eq!(ranked[0].relevance_score, 0.9);
    }

    #[test]
    fn test_apply_rerank_truncates() {
        let ranked = apply_rerank(chunks(), vec![result(0, 0.1), result(2, 0.9)], 1).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].control_number, Some(2));
    }

    #[test]
    fn test_apply_rerank_bad_index() {
        let err = apply_rerank(chunks(), vec![result(5, 0.3)], 10).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_empty_input_short_circuits() {
        let config = RerankerConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            ..crate::config::AppConfig::default().reranker
        };
        let reranker = HttpReranker::new(&config).unwrap();
        let results = reranker.rerank("q", &[], 10).await.unwrap();
        assert!(results.is_empty());
    }
}
