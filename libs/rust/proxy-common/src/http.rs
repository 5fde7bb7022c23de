//! Centralized HTTP client configuration and building.
//!
//! Provides a standardized way to create the outbound HTTP client used to
//! reach the token review authority.

use reqwest::{Certificate, Client, ClientBuilder};
use std::time::Duration;

use crate::PlatformError;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// Extra PEM-encoded CA bundles to trust
    pub root_certificates: Vec<Vec<u8>>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: concat!("kube-auth-proxy/", env!("CARGO_PKG_VERSION")).to_string(),
            root_certificates: Vec::new(),
        }
    }
}

impl HttpConfig {
    /// Trust an additional PEM-encoded CA bundle.
    #[must_use]
    pub fn with_root_certificate_pem(mut self, pem: Vec<u8>) -> Self {
        self.root_certificates.push(pem);
        self
    }
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns an error if a CA bundle cannot be parsed or the client cannot be
/// built (e.g. TLS initialization fails).
///
/// # Examples
///
/// ```
/// use proxy_common::{HttpConfig, build_http_client};
///
/// let client = build_http_client(&HttpConfig::default());
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls();

    for pem in &config.root_certificates {
        let bundle = Certificate::from_pem_bundle(pem)
            .map_err(|e| PlatformError::invalid_input(format!("invalid CA bundle: {e}")))?;
        if bundle.is_empty() {
            return Err(PlatformError::invalid_input("CA bundle contains no certificates"));
        }
        for cert in bundle {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}
