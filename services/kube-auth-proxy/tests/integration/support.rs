//! Shared test fixtures.

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response};
use kube_auth_proxy::proxy::{Forwarder, ProxyState};
use kube_auth_proxy::review::{BearerToken, TokenReview, TokenReviewer, UserInfo};
use kube_auth_proxy::server::router;
use proxy_common::PlatformError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Reviewer returning a fixed outcome.
pub struct StubReviewer {
    outcome: Result<TokenReview, String>,
    calls: AtomicUsize,
}

impl StubReviewer {
    pub fn authenticated(user: UserInfo) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(TokenReview::authenticated(user)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unauthenticated(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(TokenReview::unauthenticated(reason)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(reason.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenReviewer for StubReviewer {
    async fn review(&self, _token: &BearerToken) -> Result<TokenReview, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone().map_err(PlatformError::unavailable)
    }
}

/// The test service account identity.
pub fn test_user() -> UserInfo {
    UserInfo::new("system:serviceaccount:default:test")
        .with_groups(["system:serviceaccounts"])
        .with_extra("cluster-name", ["cluster-b"])
}

/// Router proxying to `upstream` and reviewing with `reviewer`.
pub fn proxy_app(upstream: &str, reviewer: Arc<dyn TokenReviewer>) -> Router {
    let forwarder = Forwarder::new(&Url::parse(upstream).unwrap()).unwrap();
    router(ProxyState::new(reviewer, forwarder))
}

/// `GET uri` with an optional bearer token.
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Collects a response body as JSON.
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
