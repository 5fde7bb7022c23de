//! Authenticating reverse proxy.
//!
//! [`handler::proxy_handler`] authenticates every request, replaces the bearer
//! credential with forwarded identity headers and hands the request to the
//! [`forward::Forwarder`]. [`access_log`] emits one record per request.

pub mod access_log;
pub mod forward;
pub mod handler;

pub use access_log::{LoggedBody, RequestLog};
pub use forward::Forwarder;
pub use handler::{ProxyState, extract_bearer_token, inject_identity_headers, proxy_handler};

/// Verified username.
pub const HEADER_FORWARDED_USER: &str = "x-forwarded-user";
/// Verified groups, comma-joined.
pub const HEADER_FORWARDED_GROUPS: &str = "x-forwarded-groups";
/// First `cluster-name` extra attribute of the verified identity.
pub const HEADER_FORWARDED_EXTRA_CLUSTER: &str = "x-forwarded-extra-cluster-name";
