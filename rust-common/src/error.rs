//! Transport-level error types.
//!
//! Everything that can go wrong between building a request and receiving
//! a response, before any HTTP status or body is interpreted.

use thiserror::Error;

/// Transport error with built-in retryability classification.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Service is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Connection failures, timeouts and temporary unavailability are
    /// transient; malformed input is not.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::unavailable("connection reset");
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::invalid_input("bad header value");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout(_) => true,
            Self::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::Serialization(_) | Self::InvalidInput(_) => false,
        }
    }

    /// Classify a reqwest failure: timeouts, unreachable servers, then
    /// everything else.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
