//! Authentication for the export endpoints
//!
//! Provides:
//! - API key hashing and validation
//! - Bearer token extraction
//! - `ExportAuth` extractor, rejecting before the handler body runs

use crate::errors::{AppError, Result};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use sha2::{Digest, Sha256};

/// Hash an API key for storage in configuration
pub fn hash_api_key(api_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate an API key against a stored hash
pub fn validate_api_key(api_key: &str, stored_hash: &str) -> bool {
    let computed = hash_api_key(api_key);
    let stored = stored_hash.trim().to_ascii_lowercase();

    if computed.len() != stored.len() {
        return false;
    }

    // Constant-time comparison
    computed
        .bytes()
        .zip(stored.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Extract API key from Authorization header
pub fn extract_api_key(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Configured export key hash, provided by the application state
#[derive(Debug, Clone, Default)]
pub struct ExportKeyHash(pub Option<String>);

/// Proof that the caller presented the export API key
#[derive(Debug, Clone, Copy)]
pub struct ExportAuth;

impl ExportAuth {
    /// Check an `Authorization` header value against the configured hash
    pub fn verify(auth_header: Option<&str>, expected: &ExportKeyHash) -> Result<Self> {
        let Some(ref stored_hash) = expected.0 else {
            return Err(AppError::Unauthorized {
                message: "Export is disabled".to_string(),
            });
        };

        let header = auth_header.ok_or_else(|| AppError::Unauthorized {
            message: "Missing Authorization header".to_string(),
        })?;

        let api_key = extract_api_key(header).ok_or_else(|| AppError::Unauthorized {
            message: "Expected a Bearer API key".to_string(),
        })?;

        if validate_api_key(api_key, stored_hash) {
            Ok(ExportAuth)
        } else {
            Err(AppError::InvalidApiKey)
        }
    }
}

/// Axum extractor for ExportAuth
impl<S> FromRequestParts<S> for ExportAuth
where
    S: Send + Sync,
    ExportKeyHash: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let expected = ExportKeyHash::from_ref(state);
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

        ExportAuth::verify(header, &expected).inspect_err(|e| {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Export authentication rejected");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_api_key() {
        let key = "export_test_12345";
        let hash = hash_api_key(key);
        assert_eq!(hash.len(), 64);
        assert!(validate_api_key(key, &hash));
        assert!(validate_api_key(key, &hash.to_uppercase()));
        assert!(!validate_api_key("wrong_key", &hash));
        assert!(!validate_api_key(key, "short"));
    }

    #[test]
    fn test_extract_api_key() {
        assert_eq!(extract_api_key("Bearer key_123"), Some("key_123"));
        assert_eq!(extract_api_key("Bearer "), None);
        assert_eq!(extract_api_key("key_123"), None);
        assert_eq!(extract_api_key("Basic abc"), None);
    }

    #[test]
    fn test_verify() {
        let expected = ExportKeyHash(Some(hash_api_key("secret")));

        assert!(ExportAuth::verify(Some("Bearer secret"), &expected).is_ok());
        assert!(matches!(
            ExportAuth::verify(Some("Bearer nope"), &expected),
            Err(AppError::InvalidApiKey)
        ));
        assert!(matches!(
            ExportAuth::verify(None, &expected),
            Err(AppError::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_verify_disabled_without_hash() {
        let result = ExportAuth::verify(Some("Bearer secret"), &ExportKeyHash(None));
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
    }
}
