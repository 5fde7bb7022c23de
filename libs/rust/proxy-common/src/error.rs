//! Centralized error types shared by the proxy crates.
//!
//! Every error is classified as retryable or not. The proxy itself never
//! retries, but the classification is recorded alongside failures so that
//! operators can tell an unreachable authority from a misconfigured one.

use thiserror::Error;

/// Common error type for platform operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote service answered with a non-success status
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on a later
    /// request, such as connection failures, timeouts or a remote service
    /// answering with a server error.
    ///
    /// # Examples
    ///
    /// ```
    /// use proxy_common::PlatformError;
    ///
    /// let err = PlatformError::unavailable("status 503");
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::invalid_input("bad level");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            Self::Unavailable(_) => true,
            Self::Serialization(_) | Self::InvalidInput(_) | Self::Io { .. } => false,
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

    /// Create an I/O error for the given path.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
