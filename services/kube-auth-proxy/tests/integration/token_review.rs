//! Token Review Client Integration Tests
//!
//! HttpTokenReviewer against a mock TokenReview authority.

use kube_auth_proxy::review::http::TOKEN_REVIEW_PATH;
use kube_auth_proxy::review::{BearerToken, HttpTokenReviewer, TokenReviewer};
use proxy_common::PlatformError;
use serde_json::json;
use std::path::PathBuf;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn authenticated_response() -> serde_json::Value {
    json!({
        "apiVersion": "authentication.k8s.io/v1",
        "kind": "TokenReview",
        "status": {
            "authenticated": true,
            "user": {
                "username": "system:serviceaccount:default:test",
                "uid": "4a0b4b1c-0000-0000-0000-000000000000",
                "groups": ["system:serviceaccounts", "system:authenticated"],
                "extra": {"cluster-name": ["cluster-b"]}
            }
        }
    })
}

fn write_token_file(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("kube-auth-proxy-token-{}", Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn test_posts_token_review_body() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "apiVersion": "authentication.k8s.io/v1",
            "kind": "TokenReview",
            "spec": {"token": "client-token"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(authenticated_response()))
        .expect(1)
        .mount(&authority)
        .await;

    let reviewer = HttpTokenReviewer::with_url(&authority.uri()).unwrap();
    let review = reviewer.review(&BearerToken::new("client-token")).await.unwrap();

    assert!(review.is_authenticated());
    assert_eq!(review.status.user.username, "system:serviceaccount:default:test");
    assert_eq!(review.status.user.groups.len(), 2);
    assert_eq!(review.status.user.cluster_name(), Some("cluster-b"));
}

#[tokio::test]
async fn test_custom_endpoint_sends_no_credential() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(authenticated_response()))
        .mount(&authority)
        .await;

    let reviewer = HttpTokenReviewer::with_url(&authority.uri()).unwrap();
    reviewer.review(&BearerToken::new("client-token")).await.unwrap();

    let received = authority.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_token_file_credential() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .and(header("authorization", "Bearer proxy-sa-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(authenticated_response()))
        .expect(1)
        .mount(&authority)
        .await;

    let token_file = write_token_file("proxy-sa-token\n");
    let reviewer = HttpTokenReviewer::with_url(&authority.uri())
        .unwrap()
        .with_token_file(&token_file);
    let review = reviewer.review(&BearerToken::new("client-token")).await;
    std::fs::remove_file(&token_file).unwrap();

    assert!(review.unwrap().is_authenticated());
}

#[tokio::test]
async fn test_missing_token_file_is_an_error() {
    let authority = MockServer::start().await;
    let reviewer = HttpTokenReviewer::with_url(&authority.uri())
        .unwrap()
        .with_token_file("/nonexistent/kube-auth-proxy/token");

    let err = reviewer.review(&BearerToken::new("client-token")).await.unwrap_err();

    assert!(matches!(err, PlatformError::Io { .. }));
    assert!(authority.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_verdict_is_ok() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "apiVersion": "authentication.k8s.io/v1",
            "kind": "TokenReview",
            "status": {"authenticated": false, "error": "token has expired"}
        })))
        .mount(&authority)
        .await;

    let reviewer = HttpTokenReviewer::with_url(&authority.uri()).unwrap();
    let review = reviewer.review(&BearerToken::new("expired")).await.unwrap();

    assert!(!review.is_authenticated());
    assert_eq!(review.status.error, "token has expired");
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&authority)
        .await;

    let reviewer = HttpTokenReviewer::with_url(&authority.uri()).unwrap();
    let err = reviewer.review(&BearerToken::new("client-token")).await.unwrap_err();

    assert!(matches!(err, PlatformError::Unavailable(_)));
}

#[tokio::test]
async fn test_undecodable_response_is_an_error() {
    let authority = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEW_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&authority)
        .await;

    let reviewer = HttpTokenReviewer::with_url(&authority.uri()).unwrap();
    let err = reviewer.review(&BearerToken::new("client-token")).await.unwrap_err();

    assert!(matches!(err, PlatformError::Serialization(_)));
}

#[tokio::test]
async fn test_unreachable_authority_is_an_error() {
    let reviewer = HttpTokenReviewer::with_url("http://127.0.0.1:1").unwrap();
    let err = reviewer.review(&BearerToken::new("client-token")).await.unwrap_err();

    assert!(matches!(err, PlatformError::Http(_)));
}
