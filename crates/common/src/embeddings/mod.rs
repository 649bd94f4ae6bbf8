//! Embedding service abstraction
//!
//! Queries are embedded with the same model that produced the chunk vectors
//! in the vector store, served behind an OpenAI-compatible endpoint.

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use crate::http::build_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const SERVICE: &str = "embedding";

/// Trait for embedding generation
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| AppError::malformed(SERVICE, "empty embedding response"))
    }

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    model: String,
    url: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = build_client(
            config.timeout_secs,
            config.api_key.as_deref(),
            config.host_header.as_deref(),
        )?;

        Ok(Self {
            client,
            model: config.model.clone(),
            url: format!("{}/v1/embeddings", config.api_base.trim_end_matches('/')),
            timeout_ms: config.timeout_secs * 1000,
        })
    }
}

/// Restore input order when the server reports indices
fn order_embeddings(mut data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(AppError::malformed(
            SERVICE,
            format!("expected {} embeddings, got {}", expected, data.len()),
        ));
    }

    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }

    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            input: texts,
            model: &self.model,
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

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        order_embeddings(result.data, texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_embed_uses_batch() {
        let embedding = FixedEmbedder.embed("four").await.unwrap();
        assert_eq!(embedding, vec![4.0]);
    }

    #[test]
    fn test_order_embeddings_by_index() {
        let data = vec![
            EmbeddingData { index: Some(1), embedding: vec![1.0] },
            EmbeddingData { index: Some(0), embedding: vec![0.0] },
        ];
        assert_eq!(order_embeddings(data, 2).unwrap(), vec![vec![0.0], vec![1.0]]);
    }

    #[test]
    fn test_order_embeddings_count_mismatch() {
        let data = vec![EmbeddingData { index: None, embedding: vec![1.0] }];
        let err = order_embeddings(data, 2).unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[test]
    fn test_client_url() {
        let config = crate::config::AppConfig::default().embedding;
        let embedder = OpenAIEmbedder::new(&config).unwrap();
        assert_eq!(embedder.url, "http://localhost:8001/v1/embeddings");
        assert_eq!(embedder.model_name(), "bge-m3");
    }
}
