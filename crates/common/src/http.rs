//! Shared reqwest client construction for hosted inference endpoints

use crate::errors::{AppError, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, HOST};
use std::time::Duration;

/// Build a client with a fixed timeout, an optional bearer key and an
/// optional `Host` override sent on every request.
pub(crate) fn build_client(
    timeout_secs: u64,
    api_key: Option<&str>,
    host_header: Option<&str>,
) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();

    if let Some(key) = api_key {
        let value = HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
            AppError::Configuration {
                message: "API key contains characters not allowed in a header".to_string(),
            }
        })?;
        headers.insert(AUTHORIZATION, value);
    }

    if let Some(host) = host_header {
        let value = HeaderValue::from_str(host).map_err(|_| AppError::Configuration {
            message: format!("Invalid host header override: {}", host),
        })?;
        headers.insert(HOST, value);
    }

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .default_headers(headers)
        .build()
        .map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })
}
