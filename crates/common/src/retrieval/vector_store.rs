//! OpenSearch k-NN vector store

use super::RetrievedChunk;
use crate::config::VectorStoreConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

const SERVICE: &str = "vector_store";

/// Field path of the record identifier inside chunk metadata
const CONTROL_NUMBER_FIELD: &str = "metadata.control_number";

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top `k` chunks nearest to `vector`, closest first
    async fn similarity_search(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;

    /// Up to `size` chunks belonging to one record, no similarity ranking
    async fn find_by_control_number(
        &self,
        control_number: i64,
        size: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}

pub struct OpenSearchVectorStore {
    client: reqwest::Client,
    search_url: String,
    username: Option<String>,
    password: Option<String>,
    vector_field: String,
    text_field: String,
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
    #[serde(rename = "_source")]
    source: Map<String, Value>,
}

impl OpenSearchVectorStore {
    pub fn new(config: &VectorStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            search_url: format!("{}/{}/_search", config.url.trim_end_matches('/'), config.index),
            username: config.username.clone(),
            password: config.password.clone(),
            vector_field: config.vector_field.clone(),
            text_field: config.text_field.clone(),
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    fn knn_body(&self, vector: &[f32], k: usize) -> Value {
        json!({
            "size": k,
            "query": {
                "knn": {
                    self.vector_field.as_str(): { "vector": vector, "k": k }
                }
            },
            "_source": [self.text_field.as_str(), "metadata"]
        })
    }

    fn term_body(&self, control_number: i64, size: usize) -> Value {
        json!({
            "query": { "term": { CONTROL_NUMBER_FIELD: control_number } },
            "size": size,
            "_source": [self.text_field.as_str(), "metadata"]
        })
    }

    async fn execute(&self, body: &Value) -> Result<Vec<RetrievedChunk>> {
        let mut request = self.client.post(&self.search_url).json(body);
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

        let raw: Value = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        parse_chunks(raw, &self.text_field)
    }
}

/// Extract chunks from a search response, dropping hits without text
pub(crate) fn parse_chunks(raw: Value, text_field: &str) -> Result<Vec<RetrievedChunk>> {
    let parsed: OsResponse =
        serde_json::from_value(raw).map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

    Ok(parsed
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            let text = hit.source.get(text_field)?.as_str()?.to_string();
            let control_number = hit
                .source
                .get("metadata")
                .and_then(|m| m.get("control_number"))
                .and_then(control_number_value);
            Some(RetrievedChunk { text, control_number })
        })
        .collect())
}

/// Ingestion stored control numbers both as integers and as strings
fn control_number_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl VectorStore for OpenSearchVectorStore {
    async fn similarity_search(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        self.execute(&self.knn_body(vector, k)).await
    }

    async fn find_by_control_number(
        &self,
        control_number: i64,
        size: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        self.execute(&self.term_body(control_number, size)).await
    }
}
