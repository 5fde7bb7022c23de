//! Shared library for cross-cutting concerns in kube-auth-proxy.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - HTTP client configuration and building
//! - Tracing subscriber initialisation and log level parsing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, init_tracing, parse_log_level};
