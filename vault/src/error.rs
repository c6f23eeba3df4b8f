//! Vault session error types using thiserror 2.0.
//!
//! Every failure a session operation can surface, with the HTTP
//! status/path/body triple kept intact for callers that branch on it.

use reqwest::StatusCode;
use rust_common::PlatformError;
use thiserror::Error;

/// Vault session errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// No token present: never logged in, or logged out
    #[error("Session is not authenticated")]
    Unauthenticated,

    /// Credential kind not recognized
    #[error("Unsupported credential kind: {0}")]
    UnsupportedCredentialKind(String),

    /// Non-success HTTP status from the service
    #[error("HTTP {status} at {path}")]
    Http {
        /// Response status
        status: StatusCode,
        /// Request URL path, e.g. `/v1/auth/token/renew-self`
        path: String,
        /// Parsed JSON error body, if any
        body: Option<serde_json::Value>,
    },

    /// Response body did not satisfy the expected contract
    #[error("Response validation failed at {path}: {message}")]
    Validation {
        /// Request URL path
        path: String,
        /// What was wrong with the body
        message: String,
    },

    /// Operation cancelled through its cancellation token
    #[error("Request cancelled")]
    Cancelled,

    /// Wrapping token was not created at the expected path
    #[error("Wrapping creation path mismatch: expected {expected}, got {actual}")]
    CreationPathMismatch {
        /// Path the caller expected
        expected: String,
        /// Path reported by the wrapping lookup
        actual: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transport failure
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Check if error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Platform(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Whether the service refused the credentials (HTTP 403).
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.status() == Some(StatusCode::FORBIDDEN)
    }

    /// HTTP status, when the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Service-reported error messages from the `errors` array of the body.
    #[must_use]
    pub fn service_errors(&self) -> Vec<String> {
        let Self::Http { body: Some(body), .. } = self else {
            return Vec::new();
        };
        body.get("errors")
            .and_then(serde_json::Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn http(status: StatusCode, path: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self::Http {
            status,
            path: path.into(),
            body,
        }
    }

    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}
