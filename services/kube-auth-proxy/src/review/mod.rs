//! Token review: delegated validation of bearer tokens.
//!
//! [`TokenReviewer`] is the validation capability. [`HttpTokenReviewer`] talks
//! to a TokenReview endpoint and [`CachedTokenReviewer`] decorates any reviewer
//! with a short-lived cache of positive verdicts.

pub mod cache;
pub mod http;
pub mod types;

use async_trait::async_trait;
use proxy_common::PlatformError;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

pub use cache::{CACHE_TTL, CachedTokenReviewer};
pub use http::HttpTokenReviewer;
pub use types::{EXTRA_KEY_CLUSTER_NAME, TokenReview, TokenReviewStatus, UserInfo};

/// A bearer credential taken from an `Authorization` header.
///
/// The raw value is only reachable through [`BearerToken::expose`]; `Debug`
/// output is redacted.
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wraps a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Raw token value, for sending to the authority.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// SHA-256 digest of the token, used wherever the token has to be keyed on.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.expose().as_bytes()).into()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Validates bearer tokens against an authentication authority.
///
/// A review that completes with `authenticated == false` is `Ok`; `Err` means
/// no verdict could be obtained. Implementations make at most one call to the
/// authority per invocation and never retry.
///
/// Dropping the returned future abandons any in-flight call.
#[async_trait]
pub trait TokenReviewer: Send + Sync {
    /// Reviews a non-empty token.
    async fn review(&self, token: &BearerToken) -> Result<TokenReview, PlatformError>;
}

#[async_trait]
impl<R: TokenReviewer + ?Sized> TokenReviewer for Arc<R> {
    async fn review(&self, token: &BearerToken) -> Result<TokenReview, PlatformError> {
        (**self).review(token).await
    }
}
