//! Liveness endpoint.

use axum::Json;
use serde::Serialize;

/// Body of a `/healthz` response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `"ok"` while the process serves requests
    pub status: &'static str,
    /// Crate version of the running binary
    pub version: &'static str,
}

impl HealthStatus {
    /// Status of this process.
    #[must_use]
    pub const fn current() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// `GET /healthz`; needs no authentication.
pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus::current())
}
