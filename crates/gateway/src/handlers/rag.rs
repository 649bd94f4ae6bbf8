//! RAG question answering handler

use axum::{extract::State, Json};
use inspireqa_common::{
    errors::Result,
    pipeline::{RagAnswer, RagPaperAnswer},
};
use serde::Serialize;

use super::{query::QueryRequest, validate_request};
use crate::AppState;

/// Corpus-wide answer, or a single-record answer when a control number is given
#[derive(Serialize)]
#[serde(untagged)]
pub enum RagResponse {
    Corpus(RagAnswer),
    Paper(RagPaperAnswer),
}

pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RagResponse>> {
    validate_request(&request)?;

    let model = request.model_or(&state.config.llm.default_model);
    tracing::info!(
        model = model,
        control_number = request.control_number,
        "Received RAG query"
    );

    let response = match request.control_number {
        Some(control_number) => RagResponse::Paper(
            state
                .rag
                .answer_paper(&request.query, model, control_number, &request.history)
                .await?,
        ),
        None => RagResponse::Corpus(
            state
                .rag
                .answer(&request.query, model, request.user.as_deref())
                .await?,
        ),
    };

    Ok(Json(response))
}
