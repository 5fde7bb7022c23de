//! Error handling for the request path.
//!
//! [`AuthProxyError`] covers every way a proxied request can fail. Each
//! variant maps to an HTTP status and a stable [`ErrorCode`]. Responses carry a
//! generic message and a correlation ID; the detailed cause (authority reason,
//! transport error) is only ever logged.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use proxy_common::PlatformError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Failure of a proxied request.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AuthProxyError {
    /// No `Authorization: Bearer <token>` header on the request
    #[error("Bearer token missing from request")]
    TokenMissing,

    /// The authority reviewed the token and rejected it
    #[error("Token not authenticated: {reason}")]
    Unauthenticated {
        /// Reason given by the authority
        reason: String,
    },

    /// No verdict could be obtained from the authority
    #[error("Token review failed: {0}")]
    Review(#[from] PlatformError),

    /// The verdict holds a value that cannot travel in an HTTP header
    #[error("Identity attribute {header} is not a valid header value")]
    InvalidIdentity {
        /// Header that could not be set
        header: &'static str,
    },

    /// Forwarding to the backend failed
    #[error("Upstream request failed: {reason}")]
    Upstream {
        /// Transport error description
        reason: String,
    },

    /// Internal error (details sanitized in responses)
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Stable error codes reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    /// `AUTH_TOKEN_MISSING`
    TokenMissing,
    /// `AUTH_TOKEN_INVALID`
    TokenInvalid,
    /// `AUTH_REVIEW_UNAVAILABLE`
    ReviewUnavailable,
    /// `UPSTREAM_UNAVAILABLE`
    UpstreamUnavailable,
    /// `INTERNAL_ERROR`
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TokenMissing => "AUTH_TOKEN_MISSING",
            Self::TokenInvalid => "AUTH_TOKEN_INVALID",
            Self::ReviewUnavailable => "AUTH_REVIEW_UNAVAILABLE",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this code
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TokenMissing | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::ReviewUnavailable | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
        }
    }
}

/// Body of an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: &'static str,
    /// Generic human-readable message; never the error detail
    pub message: String,
    /// Correlation ID matching the server-side log record
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Builds the client-facing body for `error`.
    #[must_use]
    pub fn from_error(error: &AuthProxyError, correlation_id: Uuid) -> Self {
        let message = match error {
            AuthProxyError::TokenMissing => "Authentication required",
            AuthProxyError::Unauthenticated { .. } => "Authentication failed",
            // Never expose authority or internal details
            AuthProxyError::Review(_)
            | AuthProxyError::InvalidIdentity { .. }
            | AuthProxyError::Internal(_) => "Internal error",
            AuthProxyError::Upstream { .. } => "Upstream unavailable",
        };

        Self {
            code: error.code().as_str(),
            message: message.to_string(),
            correlation_id,
        }
    }
}

impl AuthProxyError {
    /// Get the error code for this error
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::TokenMissing => ErrorCode::TokenMissing,
            Self::Unauthenticated { .. } => ErrorCode::TokenInvalid,
            Self::Review(_) => ErrorCode::ReviewUnavailable,
            Self::Upstream { .. } => ErrorCode::UpstreamUnavailable,
            Self::InvalidIdentity { .. } | Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.code().status()
    }

    /// Whether a later identical request could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Review(err) => err.is_retryable(),
            Self::Upstream { .. } => true,
            _ => false,
        }
    }

    /// Builds the HTTP response for this error, tagged with `correlation_id`.
    #[must_use]
    pub fn into_response_with(self, correlation_id: Uuid) -> Response {
        let body = ErrorResponse::from_error(&self, correlation_id);
        (self.status(), Json(body)).into_response()
    }
}

impl IntoResponse for AuthProxyError {
    fn into_response(self) -> Response {
        self.into_response_with(Uuid::new_v4())
    }
}
