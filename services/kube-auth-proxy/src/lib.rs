//! Kube Auth Proxy Library
//!
//! Authenticating reverse proxy for workloads in a Kubernetes cluster.
//! Bearer tokens are validated through the TokenReview API, positive verdicts
//! are cached briefly, and the verified identity is forwarded to the backend
//! in `X-Forwarded-*` headers in place of the credential.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod health;
pub mod proxy;
pub mod review;
pub mod server;
pub mod shutdown;

pub use config::{Config, ConfigError};
pub use error::AuthProxyError;
pub use review::{BearerToken, CachedTokenReviewer, HttpTokenReviewer, TokenReview, TokenReviewer};
