//! TokenReview over HTTP.
//!
//! Two flavours share one implementation:
//! - in-cluster: the Kubernetes API server, authenticated with the pod's
//!   service-account token and trusting the cluster CA;
//! - custom: any TokenReview-compatible endpoint, called without credentials
//!   unless a token file is supplied.

use async_trait::async_trait;
use proxy_common::{HttpConfig, PlatformError, build_http_client};
use reqwest::header::AUTHORIZATION;
use std::env;
use std::path::PathBuf;
use tracing::{debug, instrument, warn};

use super::types::TokenReviewRequest;
use super::{BearerToken, TokenReview, TokenReviewer};

/// Path of the TokenReview collection relative to the authority base URL.
pub const TOKEN_REVIEW_PATH: &str = "/apis/authentication.k8s.io/v1/tokenreviews";

/// Mounted service-account token.
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// Mounted cluster CA bundle.
pub const SERVICE_ACCOUNT_CA_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Where the proxy finds its own credential for the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ServiceCredential {
    /// No credential is sent.
    None,
    /// Token file, re-read on every call so rotated tokens are picked up.
    TokenFile(PathBuf),
}

/// Location and trust material of the in-cluster API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClusterConfig {
    /// API server host (IP or name)
    pub host: String,
    /// API server port
    pub port: String,
    /// Service-account token file
    pub token_path: PathBuf,
    /// Cluster CA bundle
    pub ca_path: PathBuf,
}

impl InClusterConfig {
    /// Reads the API server location from the standard pod environment.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] when not running inside a pod.
    pub fn from_env() -> Result<Self, PlatformError> {
        let host = env::var("KUBERNETES_SERVICE_HOST").unwrap_or_default();
        let port = env::var("KUBERNETES_SERVICE_PORT").unwrap_or_default();
        if host.is_empty() || port.is_empty() {
            return Err(PlatformError::invalid_input(
                "not running in a cluster: KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be set",
            ));
        }
        Ok(Self {
            host,
            port,
            token_path: PathBuf::from(SERVICE_ACCOUNT_TOKEN_PATH),
            ca_path: PathBuf::from(SERVICE_ACCOUNT_CA_PATH),
        })
    }

    /// `https://host:port`, bracketing IPv6 literals.
    #[must_use]
    pub fn base_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("https://[{}]:{}", self.host, self.port)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }
}

/// [`TokenReviewer`] that POSTs TokenReview objects to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpTokenReviewer {
    url: String,
    credential: ServiceCredential,
    client: reqwest::Client,
}

impl HttpTokenReviewer {
    /// Reviewer for a custom authority at `base_url`, called without credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_url(base_url: &str) -> Result<Self, PlatformError> {
        let client = build_http_client(&HttpConfig::default())?;
        Ok(Self {
            url: review_url(base_url),
            credential: ServiceCredential::None,
            client,
        })
    }

    /// Reviewer for the API server of the cluster the proxy runs in.
    ///
    /// # Errors
    ///
    /// Returns an error when not running in a pod or when the cluster CA
    /// cannot be loaded.
    pub fn in_cluster() -> Result<Self, PlatformError> {
        Self::from_in_cluster_config(&InClusterConfig::from_env()?)
    }

    /// Reviewer for an explicitly described in-cluster API server.
    ///
    /// # Errors
    ///
    /// Returns an error when the CA bundle cannot be read or parsed.
    pub fn from_in_cluster_config(config: &InClusterConfig) -> Result<Self, PlatformError> {
        let ca = std::fs::read(&config.ca_path)
            .map_err(|e| PlatformError::io(config.ca_path.display().to_string(), e))?;
        let client = build_http_client(&HttpConfig::default().with_root_certificate_pem(ca))?;
        Ok(Self {
            url: review_url(&config.base_url()),
            credential: ServiceCredential::TokenFile(config.token_path.clone()),
            client,
        })
    }

    /// Authenticates calls with the token stored at `path`.
    #[must_use]
    pub fn with_token_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential = ServiceCredential::TokenFile(path.into());
        self
    }

    /// Full TokenReview URL this reviewer posts to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether calls carry the proxy's own credential.
    #[must_use]
    pub const fn sends_credential(&self) -> bool {
        matches!(self.credential, ServiceCredential::TokenFile(_))
    }

    async fn service_token(&self) -> Result<Option<String>, PlatformError> {
        match &self.credential {
            ServiceCredential::None => Ok(None),
            ServiceCredential::TokenFile(path) => {
                let token = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| PlatformError::io(path.display().to_string(), e))?;
                Ok(Some(token.trim().to_string()))
            }
        }
    }
}

#[async_trait]
impl TokenReviewer for HttpTokenReviewer {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn review(&self, token: &BearerToken) -> Result<TokenReview, PlatformError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&TokenReviewRequest::new(token.expose()));
        if let Some(service_token) = self.service_token().await? {
            request = request.header(AUTHORIZATION, format!("Bearer {service_token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, "token review rejected by authority");
            return Err(PlatformError::unavailable(format!(
                "token review returned status {status}"
            )));
        }

        let body = response.bytes().await?;
        let review: TokenReview = serde_json::from_slice(&body)?;
        debug!(authenticated = review.is_authenticated(), "token review completed");
        Ok(review)
    }
}

/// Appends [`TOKEN_REVIEW_PATH`] to an authority base URL.
fn review_url(base_url: &str) -> String {
    format!("{}{TOKEN_REVIEW_PATH}", base_url.trim_end_matches('/'))
}
