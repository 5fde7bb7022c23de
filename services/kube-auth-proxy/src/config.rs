//! Type-Safe Configuration with Validation
//!
//! Every setting is a command-line flag that can also be supplied through the
//! environment (and a `.env` file). Raw values are validated into [`Config`].

use clap::Parser;
use proxy_common::{PlatformError, TracingConfig, parse_log_level};
use std::path::PathBuf;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::review::HttpTokenReviewer;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Offending setting
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// Invalid port number
    #[error("Invalid port: must be between 1 and 65535")]
    InvalidPort,

    /// Missing required field
    #[error("Missing required configuration: --{0}")]
    MissingRequired(&'static str),

    /// Unknown log level
    #[error("Invalid log level: {0}")]
    InvalidLogLevel(#[source] PlatformError),

    /// Token review client could not be created
    #[error("Failed to create token reviewer: {0}")]
    TokenReviewer(#[source] PlatformError),

    /// Command line could not be parsed
    #[error(transparent)]
    Args(#[from] clap::Error),
}

/// Raw command-line / environment settings.
#[derive(Debug, Clone, Parser)]
#[command(name = "kube-auth-proxy", version, about)]
pub struct Args {
    /// Backend URL requests are forwarded to
    #[arg(long, env = "UPSTREAM")]
    pub upstream: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 4180)]
    pub port: u16,

    /// Base URL of a custom TokenReview endpoint (default: in-cluster API server)
    #[arg(long, env = "TOKEN_REVIEW_URL")]
    pub token_review_url: Option<String>,

    /// Token file used to authenticate against the custom TokenReview endpoint
    #[arg(long, env = "TOKEN_REVIEW_TOKEN_FILE", requires = "token_review_url")]
    pub token_review_token_file: Option<PathBuf>,

    /// Log verbosity: debug, info, warn or error
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

/// Where tokens are reviewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenReviewTarget {
    /// The API server of the cluster the proxy runs in
    InCluster,
    /// A custom endpoint, optionally authenticated with a token file
    Custom {
        /// Base URL of the endpoint
        url: Url,
        /// Token file for the proxy's own credential
        token_file: Option<PathBuf>,
    },
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend requests are forwarded to
    pub upstream: Url,
    /// Listen port (1-65535)
    pub port: u16,
    /// Token review authority
    pub token_review: TokenReviewTarget,
    /// Log verbosity
    pub log_level: LevelFilter,
    /// JSON log output
    pub log_json: bool,
}

impl Config {
    /// Loads configuration from `.env`, the environment and the command line.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Args`] for unparsable arguments (including
    /// `--help` and `--version`) and other variants for invalid values.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_args(Args::try_parse()?)
    }

    /// Validates raw settings.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        let upstream = match args.upstream.as_deref().map(str::trim) {
            None | Some("") => return Err(ConfigError::MissingRequired("upstream")),
            Some(raw) => parse_http_url("upstream", raw)?,
        };

        if args.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        let token_review = match args.token_review_url.as_deref().map(str::trim) {
            None | Some("") => TokenReviewTarget::InCluster,
            Some(raw) => TokenReviewTarget::Custom {
                url: parse_http_url("token-review-url", raw)?,
                token_file: args.token_review_token_file,
            },
        };

        let log_level = parse_log_level(&args.log_level).map_err(ConfigError::InvalidLogLevel)?;

        Ok(Self {
            upstream,
            port: args.port,
            token_review,
            log_level,
            log_json: args.log_json,
        })
    }

    /// Builds the token reviewer described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the in-cluster environment is missing or the
    /// HTTP client cannot be built.
    pub fn token_reviewer(&self) -> Result<HttpTokenReviewer, ConfigError> {
        let reviewer = match &self.token_review {
            TokenReviewTarget::InCluster => HttpTokenReviewer::in_cluster(),
            TokenReviewTarget::Custom { url, token_file } => {
                HttpTokenReviewer::with_url(url.as_str()).map(|reviewer| match token_file {
                    Some(path) => reviewer.with_token_file(path.clone()),
                    None => reviewer,
                })
            }
        };
        reviewer.map_err(ConfigError::TokenReviewer)
    }

    /// Human-readable description of the review target, for startup logs.
    #[must_use]
    pub fn token_review_str(&self) -> &str {
        match &self.token_review {
            TokenReviewTarget::InCluster => "in-cluster",
            TokenReviewTarget::Custom { url, .. } => url.as_str(),
        }
    }

    /// Tracing setup derived from this configuration.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig::default()
            .with_service_name("kube-auth-proxy")
            .with_log_level(self.log_level)
            .with_json_output(self.log_json)
    }
}

/// Parses an absolute `http`/`https` URL.
fn parse_http_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl {
            field,
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}
