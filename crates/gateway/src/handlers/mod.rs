//! API handlers module

pub mod export;
pub mod feedback;
pub mod health;
pub mod query;
pub mod rag;

use inspireqa_common::errors::{AppError, Result};
use validator::Validate;

/// Run `validator` rules on a request body
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}
