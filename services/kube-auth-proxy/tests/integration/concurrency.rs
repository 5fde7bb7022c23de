//! Concurrency Integration Tests
//!
//! Parallel requests sharing one cache.

use async_trait::async_trait;
use futures::future::join_all;
use kube_auth_proxy::review::{BearerToken, CachedTokenReviewer, TokenReview, TokenReviewer, UserInfo};
use proxy_common::PlatformError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

/// Holds each review at a barrier until enough are in flight at once.
struct GatedReviewer {
    gate: Barrier,
    calls: AtomicUsize,
}

#[async_trait]
impl TokenReviewer for GatedReviewer {
    async fn review(&self, _token: &BearerToken) -> Result<TokenReview, PlatformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.wait().await;
        Ok(TokenReview::authenticated(UserInfo::new("system:serviceaccount:default:test")))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_each_reach_the_authority() {
    const PARALLEL: usize = 4;
    let cached = Arc::new(CachedTokenReviewer::new(GatedReviewer {
        gate: Barrier::new(PARALLEL),
        calls: AtomicUsize::new(0),
    }));

    let reviews = (0..PARALLEL).map(|_| {
        let cached = Arc::clone(&cached);
        tokio::spawn(async move { cached.review(&BearerToken::new("shared-token")).await })
    });
    let results = tokio::time::timeout(Duration::from_secs(5), join_all(reviews))
        .await
        .expect("concurrent misses were serialized");

    for result in results {
        assert!(result.unwrap().unwrap().is_authenticated());
    }
    assert_eq!(cached.inner().calls.load(Ordering::SeqCst), PARALLEL);
    assert_eq!(cached.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_hits_share_one_entry() {
    let cached = Arc::new(CachedTokenReviewer::new(GatedReviewer {
        gate: Barrier::new(1),
        calls: AtomicUsize::new(0),
    }));
    cached.review(&BearerToken::new("warm-token")).await.unwrap();

    let reviews = (0..16).map(|_| {
        let cached = Arc::clone(&cached);
        tokio::spawn(async move { cached.review(&BearerToken::new("warm-token")).await })
    });
    for result in join_all(reviews).await {
        assert!(result.unwrap().unwrap().is_authenticated());
    }

    assert_eq!(cached.inner().calls.load(Ordering::SeqCst), 1);
}
