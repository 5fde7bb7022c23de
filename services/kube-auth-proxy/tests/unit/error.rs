//! Error Handling Unit Tests
//!
//! Status mapping, error codes and response bodies.

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kube_auth_proxy::error::{AuthProxyError, ErrorCode, ErrorResponse};
use proxy_common::PlatformError;
use uuid::Uuid;

// ============================================================================
// Error Codes
// ============================================================================

#[test]
fn test_error_codes() {
    assert_eq!(AuthProxyError::TokenMissing.code(), ErrorCode::TokenMissing);
    assert_eq!(
        AuthProxyError::Unauthenticated { reason: String::new() }.code(),
        ErrorCode::TokenInvalid
    );
    assert_eq!(
        AuthProxyError::Review(PlatformError::unavailable("down")).code(),
        ErrorCode::ReviewUnavailable
    );
    assert_eq!(
        AuthProxyError::Upstream { reason: String::new() }.code(),
        ErrorCode::UpstreamUnavailable
    );
}

#[test]
fn test_error_code_strings() {
    assert_eq!(ErrorCode::TokenMissing.as_str(), "AUTH_TOKEN_MISSING");
    assert_eq!(ErrorCode::TokenInvalid.as_str(), "AUTH_TOKEN_INVALID");
    assert_eq!(ErrorCode::ReviewUnavailable.as_str(), "AUTH_REVIEW_UNAVAILABLE");
    assert_eq!(ErrorCode::UpstreamUnavailable.as_str(), "UPSTREAM_UNAVAILABLE");
    assert_eq!(ErrorCode::Internal.as_str(), "INTERNAL_ERROR");
}

// ============================================================================
// Responses
// ============================================================================

#[tokio::test]
async fn test_response_body() {
    let correlation_id = Uuid::new_v4();
    let response = AuthProxyError::TokenMissing.into_response_with(correlation_id);

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "AUTH_TOKEN_MISSING");
    assert_eq!(body["message"], "Authentication required");
    assert_eq!(body["correlation_id"], correlation_id.to_string());
}

#[test]
fn test_into_response_status() {
    let response = AuthProxyError::Upstream { reason: "connection refused".into() }.into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

const GENERIC_MESSAGES: &[&str] = &[
    "Authentication required",
    "Authentication failed",
    "Internal error",
    "Upstream unavailable",
];

#[test]
fn test_messages_are_generic() {
    let errors = [
        AuthProxyError::TokenMissing,
        AuthProxyError::Unauthenticated { reason: "bearer token expired".into() },
        AuthProxyError::Review(PlatformError::unavailable("authority returned 401")),
        AuthProxyError::InvalidIdentity { header: "x-forwarded-user" },
        AuthProxyError::Upstream { reason: "dns error".into() },
        AuthProxyError::Internal(anyhow::anyhow!("private key missing")),
    ];

    for err in &errors {
        let body = ErrorResponse::from_error(err, Uuid::new_v4());
        assert!(GENERIC_MESSAGES.contains(&body.message.as_str()), "{err:?} leaks: {}", body.message);
    }
}
