//! Error types for InspireQA services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidApiKey,

    // Resource errors (4xxx)
    NotFound,
    QueryNotFound,
    FeedbackNotFound,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    UpstreamError,
    UpstreamTimeout,
    MalformedResponse,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidApiKey => 2002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::QueryNotFound => 4002,
            ErrorCode::FeedbackNotFound => 4003,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::UpstreamError => 8001,
            ErrorCode::UpstreamTimeout => 8002,
            ErrorCode::MalformedResponse => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Query not found: {id}")]
    QueryNotFound { id: String },

    #[error("Feedback not found for query: {id}")]
    FeedbackNotFound { id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("{service} error: {message}")]
    Upstream { service: String, message: String },

    #[error("{service} timeout after {timeout_ms}ms")]
    UpstreamTimeout { service: String, timeout_ms: u64 },

    #[error("Malformed {service} response: {message}")]
    MalformedResponse { service: String, message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidApiKey => ErrorCode::InvalidApiKey,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::QueryNotFound { .. } => ErrorCode::QueryNotFound,
            AppError::FeedbackNotFound { .. } => ErrorCode::FeedbackNotFound,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Upstream { .. } => ErrorCode::UpstreamError,
            AppError::UpstreamTimeout { .. } => ErrorCode::UpstreamTimeout,
            AppError::MalformedResponse { .. } => ErrorCode::MalformedResponse,
            AppError::HttpClient(_) => ErrorCode::UpstreamError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::MissingField { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidApiKey => StatusCode::UNAUTHORIZED,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::QueryNotFound { .. }
            | AppError::FeedbackNotFound { .. } => StatusCode::NOT_FOUND,

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Upstream { .. }
            | AppError::MalformedResponse { .. }
            | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,

            // 504 Gateway Timeout
            AppError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Map a transport failure from a collaborator into the matching variant.
    ///
    /// Timeouts keep their configured budget so the log line shows which
    /// deadline was hit.
    pub fn from_transport(service: &str, timeout_ms: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::UpstreamTimeout {
                service: service.to_string(),
                timeout_ms,
            }
        } else {
            AppError::Upstream {
                service: service.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn malformed(service: &str, message: impl Into<String>) -> Self {
        AppError::MalformedResponse {
            service: service.to_string(),
            message: message.into(),
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        // Upstream detail stays in the logs; callers get a generic failure.
        let message = match &self {
            AppError::Upstream { .. }
            | AppError::MalformedResponse { .. }
            | AppError::HttpClient(_)
            | AppError::UpstreamTimeout { .. } => "Upstream service failure".to_string(),
            _ => message,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal {
            message: format!("CSV export failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::QueryNotFound { id: "test".into() };
        assert_eq!(err.code(), ErrorCode::QueryNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Query too long".into(),
            field: Some("query".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_malformed_llm_output_is_server_error() {
        let err = AppError::malformed("llm", "missing field `terms`");
        assert_eq!(err.code(), ErrorCode::MalformedResponse);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.is_server_error());
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = AppError::UpstreamTimeout {
            service: "reranker".into(),
            timeout_ms: 40_000,
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code().as_code(), 8002);
    }
}
