//! Answer feedback and search quality reports

use axum::{
    extract::{Path, State},
    Json,
};
use inspireqa_common::{
    db::models::Feedback,
    errors::{AppError, Result},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::validate_request;
use crate::AppState;

/// Thumbs up/down on a stored answer
#[derive(Debug, Deserialize, Validate)]
pub struct FeedbackRequest {
    pub rating: bool,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub comment: Option<String>,
}

/// Free-form report about search quality
#[derive(Debug, Deserialize, Validate)]
pub struct SearchFeedbackRequest {
    #[validate(length(min = 1, max = 5000))]
    pub question: String,

    #[serde(default)]
    #[validate(length(max = 5000))]
    pub additional: Option<String>,

    #[serde(default)]
    pub matomo_client_id: Option<Uuid>,
}

/// Create or replace the feedback for a stored answer
pub async fn upsert_feedback(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Feedback>> {
    validate_request(&request)?;

    let feedback = state
        .repo
        .upsert_feedback(query_id, request.rating, request.comment)
        .await
        .inspect_err(|e| {
            tracing::warn!(query_id = %query_id, error = %e, "Feedback not saved");
        })?;

    tracing::info!(query_id = %query_id, rating = feedback.rating, "Feedback saved");

    Ok(Json(feedback))
}

pub async fn get_feedback(
    State(state): State<AppState>,
    Path(query_id): Path<Uuid>,
) -> Result<Json<Feedback>> {
    let feedback = state.repo.find_feedback(query_id).await?.ok_or_else(|| {
        tracing::warn!(query_id = %query_id, "Feedback not found");
        AppError::FeedbackNotFound {
            id: query_id.to_string(),
        }
    })?;

    Ok(Json(feedback))
}

pub async fn create_search_feedback(
    State(state): State<AppState>,
    Json(request): Json<SearchFeedbackRequest>,
) -> Result<Json<serde_json::Value>> {
    validate_request(&request)?;

    let saved = state
        .repo
        .save_search_feedback(request.question, request.additional, request.matomo_client_id)
        .await?;

    tracing::info!(id = %saved.id, "Search feedback saved");

    Ok(Json(serde_json::json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_comment_optional() {
        let request: FeedbackRequest = serde_json::from_str(r#"{"rating": true}"#).unwrap();
        assert!(request.rating);
        assert!(request.comment.is_none());
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_search_feedback_requires_question() {
        let request: SearchFeedbackRequest =
            serde_json::from_str(r#"{"question": "", "additional": "no results"}"#).unwrap();
        assert!(validate_request(&request).is_err());
    }
}
