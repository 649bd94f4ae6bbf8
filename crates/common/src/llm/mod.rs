//! Language model access
//!
//! Provides:
//! - `LanguageModel`: raw text completion against a hosted model
//! - `generate`: structured output parsing into validated schemas
//! - Prompt templates and the per-model chain registry

mod chains;
mod client;
mod prompts;

pub use chains::{ChainRegistry, LlmFactory, ModelChains};
pub use client::CompletionClient;
pub use prompts::{render_history, PromptTemplate, Prompts};

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

const SERVICE: &str = "llm";

/// Text completion backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete `prompt`, returning the raw generated text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier sent to the endpoint
    fn model(&self) -> &str;
}

/// Terms produced by query expansion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExpandedQuery {
    #[validate(length(min = 1, message = "query expansion produced no terms"))]
    pub terms: Vec<String>,
}

/// Answer with a short summary and a long cited response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnswerDraft {
    pub response: String,
    pub brief: String,
}

/// Long answer only, used for single-paper conversations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PaperAnswerDraft {
    pub response: String,
}

/// Speaker of a chat history turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One prior turn of a single-paper conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub role: ChatRole,
    pub content: String,
}

/// Slice of `text` from the first `{` to the last `}`
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a completion into `T` and validate it
pub fn parse_structured<T>(completion: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let json = extract_json_object(completion)
        .ok_or_else(|| AppError::malformed(SERVICE, "completion contains no JSON object"))?;

    let value: T = serde_json::from_str(json)
        .map_err(|e| AppError::malformed(SERVICE, format!("schema mismatch: {}", e)))?;

    value
        .validate()
        .map_err(|e| AppError::malformed(SERVICE, e.to_string()))?;

    Ok(value)
}

/// Complete `prompt` and parse the result into the output schema `T`.
///
/// A completion that does not match the schema is fatal; there is no retry.
pub async fn generate<T>(llm: &dyn LanguageModel, prompt: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let completion = llm.complete(prompt).await?;
    parse_structured(&completion).inspect_err(|e| {
        tracing::warn!(model = llm.model(), error = %e, "Structured output rejected");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_object() {
        assert_eq!(extract_json_object("x {\"a\": 1} y"), Some("{\"a\": 1}"));
        assert_eq!(extract_json_object("```json\n{}\n```"), Some("{}"));
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} {"), None);
    }

    #[test]
    fn test_parse_answer_draft() {
        let draft: AnswerDraft =
            parse_structured("Sure!\n{\"brief\": \"b\", \"response\": \"r [0]\"}").unwrap();
        assert_eq!(draft.brief, "b");
        assert_eq!(draft.response, "r [0]");
    }

    #[test]
    fn test_empty_terms_rejected() {
        let err = parse_structured::<ExpandedQuery>("{\"terms\": []}").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[test]
    fn test_missing_field_rejected() {
        let err = parse_structured::<AnswerDraft>("{\"response\": \"only\"}").unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse { .. }));
    }

    #[test]
    fn test_chat_role_wire_format() {
        let message: ChatMessage =
            serde_json::from_str("{\"type\": \"assistant\", \"content\": \"hi\"}").unwrap();
        assert_eq!(message.role, ChatRole::Assistant);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "assistant");
        assert!(value.get("role").is_none());
    }
}
