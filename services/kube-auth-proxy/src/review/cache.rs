//! Positive-verdict cache in front of a [`TokenReviewer`].
//!
//! Only authenticated verdicts are stored, for [`CACHE_TTL`]. Rejections and
//! errors always go back to the authority, so a revoked token is never served
//! from the cache past its entry's expiry.
//!
//! Expired entries are dropped lazily by the lookup that finds them; nothing
//! sweeps entries that are never looked up again. Concurrent misses for the
//! same token are not coalesced and each reach the inner reviewer.

use async_trait::async_trait;
use parking_lot::RwLock;
use proxy_common::PlatformError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use super::{BearerToken, TokenReview, TokenReviewer};

/// How long a positive verdict is reused.
pub const CACHE_TTL: Duration = Duration::from_secs(60);

/// Cache key: SHA-256 of the raw token.
type TokenDigest = [u8; 32];

struct CacheEntry {
    review: TokenReview,
    expires_at: Instant,
}

/// Outcome of a cache lookup.
enum Lookup {
    Hit(TokenReview),
    Expired,
    Miss,
}

/// Decorates a [`TokenReviewer`] with an in-memory cache of authenticated
/// verdicts.
pub struct CachedTokenReviewer<R> {
    inner: R,
    ttl: Duration,
    entries: RwLock<HashMap<TokenDigest, CacheEntry>>,
}

impl<R: TokenReviewer> CachedTokenReviewer<R> {
    /// Wraps `inner` with the standard [`CACHE_TTL`].
    pub fn new(inner: R) -> Self {
        Self::with_ttl(inner, CACHE_TTL)
    }

    /// Wraps `inner` with a custom time-to-live.
    pub fn with_ttl(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently held, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The wrapped reviewer.
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    fn lookup(&self, key: &TokenDigest, now: Instant) -> Lookup {
        match self.entries.read().get(key) {
            Some(entry) if now < entry.expires_at => Lookup::Hit(entry.review.clone()),
            Some(_) => Lookup::Expired,
            None => Lookup::Miss,
        }
    }

    fn evict_expired(&self, key: &TokenDigest, now: Instant) {
        let mut entries = self.entries.write();
        // Another request may have refreshed the entry since the read.
        if entries.get(key).is_some_and(|entry| now >= entry.expires_at) {
            entries.remove(key);
        }
    }

    fn store(&self, key: TokenDigest, review: &TokenReview) {
        let entry = CacheEntry {
            review: review.clone(),
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.write().insert(key, entry);
    }
}

#[async_trait]
impl<R: TokenReviewer> TokenReviewer for CachedTokenReviewer<R> {
    #[instrument(level = "debug", skip_all)]
    async fn review(&self, token: &BearerToken) -> Result<TokenReview, PlatformError> {
        let key = token.digest();
        let now = Instant::now();

        match self.lookup(&key, now) {
            Lookup::Hit(review) => {
                debug!("token review cache hit");
                return Ok(review);
            }
            Lookup::Expired => {
                debug!("token review cache entry expired");
                self.evict_expired(&key, now);
            }
            Lookup::Miss => debug!("token review cache miss"),
        }

        let review = self.inner.review(token).await?;
        if review.is_authenticated() {
            self.store(key, &review);
        }
        Ok(review)
    }
}
