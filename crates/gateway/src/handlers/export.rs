//! Key-protected export handlers
//!
//! `ExportAuth` is the first extractor of every handler here, so a request
//! without a valid key is rejected before its query or body is parsed.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use inspireqa_common::{
    auth::ExportAuth,
    errors::{AppError, Result},
    export,
    search::InspireFullTextSearch,
};
use serde::Deserialize;
use validator::Validate;

use super::validate_request;
use crate::AppState;

/// Inclusive export window; plain dates cover whole days
#[derive(Debug, Deserialize)]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

impl DateRange {
    pub fn bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let start = parse_bound(&self.start_date, NaiveTime::MIN)?;
        let end = parse_bound(&self.end_date, end_of_day())?;

        if start > end {
            return Err(AppError::Validation {
                message: "start_date must not be after end_date".to_string(),
                field: Some("start_date".to_string()),
            });
        }

        Ok((start, end))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN)
}

/// RFC 3339 timestamp or `YYYY-MM-DD` at `time_of_day`
fn parse_bound(value: &str, time_of_day: NaiveTime) -> Result<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(time_of_day).and_utc())
        .map_err(|_| AppError::Validation {
            message: format!("Invalid date '{}', expected YYYY-MM-DD or RFC 3339", value),
            field: None,
        })
}

fn csv_response(bytes: Vec<u8>, filename: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Stored answers in the window as CSV
pub async fn export_queries(
    _auth: ExportAuth,
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Response> {
    let (start, end) = range.bounds()?;

    let queries = state.repo.list_queries_between(start, end).await?;
    let bytes = export::queries_to_csv(&queries)?;

    tracing::info!(rows = queries.len(), %start, %end, "Exported query records");

    Ok(csv_response(
        bytes,
        export::export_filename("queries_ir", start, end),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SearchFeedbackExportParams {
    pub start_date: String,
    pub end_date: String,

    /// CSV attachment instead of a JSON list
    #[serde(default)]
    pub export_csv: bool,
}

impl SearchFeedbackExportParams {
    pub fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
        }
    }
}

pub async fn export_search_feedback(
    _auth: ExportAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchFeedbackExportParams>,
) -> Result<Response> {
    let (start, end) = params.range().bounds()?;

    let entries = state.repo.list_search_feedback_between(start, end).await?;
    tracing::info!(rows = entries.len(), csv = params.export_csv, "Exported search feedback");

    if !params.export_csv {
        return Ok(Json(entries).into_response());
    }

    let bytes = export::search_feedback_to_csv(&entries)?;
    Ok(csv_response(
        bytes,
        export::export_filename("search_feedback", start, end),
    ))
}

#[derive(Debug, Deserialize)]
pub struct QueryOsParams {
    #[serde(default = "default_os_size")]
    pub size: usize,
}

fn default_os_size() -> usize {
    5
}

#[derive(Debug, Deserialize, Validate)]
pub struct Terms {
    #[validate(length(min = 1, max = 20))]
    pub terms: Vec<String>,
}

fn require_full_text(tool: Option<&InspireFullTextSearch>) -> Result<&InspireFullTextSearch> {
    tool.ok_or_else(|| AppError::Configuration {
        message: "inspire.opensearch_url is required for full-text search".to_string(),
    })
}

/// Raw full-text search response, highlights included
pub async fn query_os(
    _auth: ExportAuth,
    State(state): State<AppState>,
    Query(params): Query<QueryOsParams>,
    Json(request): Json<Terms>,
) -> Result<Json<serde_json::Value>> {
    validate_request(&request)?;

    if params.size == 0 || params.size > 100 {
        return Err(AppError::Validation {
            message: "size must be between 1 and 100".to_string(),
            field: Some("size".to_string()),
        });
    }

    let tool = require_full_text(state.full_text.as_deref())?;
    let raw = tool.search_raw(&request.terms, params.size).await?;

    Ok(Json(serde_json::json!({ "results": raw })))
}
