//! Tracing subscriber setup.
//!
//! Logs go to stderr, as text by default or as JSON lines. `RUST_LOG`
//! overrides the configured level when set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::PlatformError;

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name attached to the startup record
    pub service_name: String,
    /// Log level filter
    pub log_level: LevelFilter,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "kube-auth-proxy".to_string(),
            log_level: LevelFilter::INFO,
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub const fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self, enabled: bool) -> Self {
        self.json_output = enabled;
        self
    }
}

/// Parse a log verbosity name.
///
/// Accepts `debug`, `info`, `warn` and `error` in any letter case. An empty
/// string selects `info`.
///
/// # Errors
///
/// Returns [`PlatformError::InvalidInput`] for any other value.
///
/// # Examples
///
/// ```
/// use proxy_common::parse_log_level;
/// use tracing::level_filters::LevelFilter;
///
/// assert_eq!(parse_log_level("WaRn").unwrap(), LevelFilter::WARN);
/// assert!(parse_log_level("trace").is_err());
/// ```
pub fn parse_log_level(value: &str) -> Result<LevelFilter, PlatformError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "warn" => Ok(LevelFilter::WARN),
        "error" => Ok(LevelFilter::ERROR),
        other => Err(PlatformError::invalid_input(format!(
            "unknown log level {other:?}, expected one of debug, info, warn, error"
        ))),
    }
}

/// Initialize tracing with the given configuration.
///
/// Installs the global subscriber; call once at startup.
pub fn init_tracing(config: &TracingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.log_level.into()));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json_output {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!(service = %config.service_name, level = %config.log_level, "tracing initialized");
}
