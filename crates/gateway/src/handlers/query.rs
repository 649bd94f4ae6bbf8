//! Search question answering handlers

use axum::{
    extract::{Path, State},
    Json,
};
use inspireqa_common::{
    db::{models::QueryIr, NewQueryRecord},
    errors::{AppError, Result},
    llm::ChatMessage,
    metrics,
    pipeline::{PlaygroundAnswer, SearchAnswer},
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use super::validate_request;
use crate::AppState;

/// Question submitted to any of the answering endpoints
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,

    /// LLM identifier; the configured default when absent
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    #[validate(length(max = 255))]
    pub user: Option<String>,

    #[serde(default)]
    pub matomo_client_id: Option<Uuid>,

    /// Restrict a RAG question to a single record
    #[serde(default)]
    pub control_number: Option<i64>,

    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl QueryRequest {
    pub fn model_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.model.as_deref().filter(|m| !m.is_empty()).unwrap_or(default)
    }
}

/// Synchronous search answer plus the id it was stored under
#[derive(Serialize)]
pub struct SearchResponse {
    /// `None` when the answer could not be stored
    pub query_id: Option<Uuid>,
    #[serde(flatten)]
    pub answer: SearchAnswer,
}

/// Run the search pipeline and store the result.
///
/// A storage failure is logged and counted; the answer is still returned.
async fn answer_and_store(
    state: &AppState,
    request: &QueryRequest,
    endpoint: &'static str,
) -> Result<(SearchAnswer, Option<Uuid>)> {
    let start = Instant::now();
    let model = request.model_or(&state.config.llm.default_model);

    let answer = state
        .search
        .search(
            &request.query,
            model,
            request.user.as_deref(),
            state.use_highlights,
        )
        .await?;

    let record = NewQueryRecord {
        query: request.query.clone(),
        brief: answer.brief.clone(),
        response: answer.response.clone(),
        references: answer.references.clone(),
        expanded_query: answer.expanded_query.clone(),
        model: model.to_string(),
        backend_version: state.config.app.backend_version.clone(),
        client_id: request.matomo_client_id,
        user_id: request.user.clone(),
        response_time: start.elapsed().as_secs_f64(),
    };

    let query_id = store_or_log(state.repo.save_query(record), endpoint).await;

    Ok((answer, query_id))
}

/// Await a save, returning the stored id or logging and counting the failure
async fn store_or_log<F>(save: F, endpoint: &'static str) -> Option<Uuid>
where
    F: Future<Output = Result<QueryIr>>,
{
    match save.await {
        Ok(saved) => {
            tracing::info!(query_id = %saved.id, endpoint = endpoint, "Query record stored");
            Some(saved.id)
        }
        Err(e) => {
            metrics::record_persistence_error(endpoint);
            tracing::error!(error = %e, endpoint = endpoint, "Failed to store query record");
            None
        }
    }
}

/// Answer in the background; the caller gets `{}` immediately
pub async fn submit_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<serde_json::Value>> {
    validate_request(&request)?;

    tokio::spawn(async move {
        if let Err(e) = answer_and_store(&state, &request, "query").await {
            tracing::error!(error = %e, query = %request.query, "Background query failed");
        }
    });

    Ok(Json(serde_json::json!({})))
}

/// Answer synchronously and store the record
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SearchResponse>> {
    validate_request(&request)?;

    let (answer, query_id) = answer_and_store(&state, &request, "search").await?;

    Ok(Json(SearchResponse { query_id, answer }))
}

/// Answer from highlights with snippet-level citations
pub async fn playground(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<PlaygroundAnswer>> {
    validate_request(&request)?;

    let model = request.model_or(&state.config.llm.default_model);
    let answer = state.search.search_playground(&request.query, model).await?;

    Ok(Json(answer))
}

/// Fetch a stored answer
pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueryIr>> {
    let query = state.repo.find_query(id).await?.ok_or_else(|| {
        tracing::warn!(query_id = %id, "Query not found");
        AppError::QueryNotFound { id: id.to_string() }
    })?;

    Ok(Json(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_request_defaults() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "What is dark matter?"}"#).unwrap();

        assert_eq!(request.model_or("llama31"), "llama31");
        assert!(request.history.is_empty());
        assert!(request.control_number.is_none());
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_request_with_history() {
        let request: QueryRequest = serde_json::from_str(
            r#"{
                "query": "And the mass bound?",
                "model": "mixtral",
                "control_number": 1234567,
                "history": [
                    {"type": "user", "content": "What is this paper about?"},
                    {"type": "assistant", "content": "Axion searches [1]."}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(request.model_or("llama31"), "mixtral");
        assert_eq!(request.control_number, Some(1234567));
        assert_eq!(request.history.len(), 2);
    }

    #[test]
    fn test_empty_query_rejected() {
        let request: QueryRequest = serde_json::from_str(r#"{"query": ""}"#).unwrap();
        assert!(matches!(
            validate_request(&request),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_search_response_flattens_answer() {
        let response = SearchResponse {
            query_id: None,
            answer: SearchAnswer {
                brief: "b".into(),
                response: "r **[1]**".into(),
                references: vec!["ref".into()],
                expanded_query: r#"ft "x""#.into(),
            },
        };

        let value = serde_json::to_value(&response).unwrap();
        assert!(value["query_id"].is_null());
        assert_eq!(value["references"][0], "ref");
        assert_eq!(value["expanded_query"], r#"ft "x""#);
    }

    fn stored(id: Uuid) -> QueryIr {
        QueryIr {
            id,
            query: "What is dark matter?".into(),
            brief: "b".into(),
            response: "r".into(),
            references: serde_json::json!([]),
            expanded_query: String::new(),
            model: "llama31".into(),
            backend_version: None,
            client_id: None,
            user_id: None,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().into(),
            response_time: 1.5,
        }
    }

    #[tokio::test]
    async fn test_stored_answer_returns_id() {
        let id = Uuid::new_v4();
        let query_id = store_or_log(async { Ok(stored(id)) }, "search").await;
        assert_eq!(query_id, Some(id));
    }

    #[tokio::test]
    async fn test_storage_failure_still_answers() {
        let response = SearchResponse {
            query_id: store_or_log(
                async {
                    Err(AppError::DatabaseConnection {
                        message: "pool timed out".into(),
                    })
                },
                "search",
            )
            .await,
            answer: SearchAnswer {
                brief: "b".into(),
                response: "r".into(),
                references: Vec::new(),
                expanded_query: String::new(),
            },
        };
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["query_id"].is_null());
        assert_eq!(value["brief"], "b");
    }
}
