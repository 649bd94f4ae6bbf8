//! OpenAI-compatible completions client (vLLM)

use super::{LanguageModel, SERVICE};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::http::build_client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Completion client bound to one model
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

impl CompletionClient {
    pub fn new(config: &LlmConfig, model: impl Into<String>) -> Result<Self> {
        let client = build_client(
            config.timeout_secs,
            config.api_key.as_deref(),
            config.host_header.as_deref(),
        )?;

        Ok(Self {
            client,
            url: format!("{}/v1/completions", config.api_base.trim_end_matches('/')),
            model: model.into(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            timeout_ms: config.timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl LanguageModel for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
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
                message: format!("LLM API error {}: {}", status, body),
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AppError::malformed(SERVICE, "empty completion choices"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
