//! Authenticating request handler.

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::access_log::{LoggedBody, RequestLog};
use super::forward::Forwarder;
use super::{HEADER_FORWARDED_EXTRA_CLUSTER, HEADER_FORWARDED_GROUPS, HEADER_FORWARDED_USER};
use crate::error::AuthProxyError;
use crate::review::{BearerToken, TokenReviewer, UserInfo};

const BEARER_PREFIX: &str = "Bearer ";

/// Shared state of the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    reviewer: Arc<dyn TokenReviewer>,
    forwarder: Forwarder,
}

impl ProxyState {
    /// Creates handler state from a (usually cached) reviewer and a forwarder.
    pub fn new(reviewer: Arc<dyn TokenReviewer>, forwarder: Forwarder) -> Self {
        Self {
            reviewer,
            forwarder,
        }
    }
}

/// Authenticates a request and forwards it to the backend.
///
/// Rejections never reach the backend. Exactly one access-log record is
/// written per request.
pub async fn proxy_handler(State(state): State<ProxyState>, request: Request) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let mut log = RequestLog::start(request.method().clone(), request.uri().path(), remote);

    let response = match authenticate_and_forward(&state, request, remote, &mut log).await {
        Ok(response) => response,
        Err(err) => {
            let correlation_id = Uuid::new_v4();
            match &err {
                AuthProxyError::TokenMissing => {
                    debug!(%correlation_id, "request without bearer token");
                }
                AuthProxyError::Unauthenticated { reason } => {
                    info!(%correlation_id, reason = %reason, "token not authenticated");
                }
                _ => {
                    error!(
                        %correlation_id,
                        error = %err,
                        retryable = err.is_retryable(),
                        "request failed"
                    );
                }
            }
            err.into_response_with(correlation_id)
        }
    };

    log.set_status(response.status());
    response.map(|body| LoggedBody::wrap(body, log))
}

async fn authenticate_and_forward(
    state: &ProxyState,
    mut request: Request,
    remote: Option<SocketAddr>,
    log: &mut RequestLog,
) -> Result<Response, AuthProxyError> {
    let token = extract_bearer_token(request.headers()).ok_or(AuthProxyError::TokenMissing)?;

    let review = state.reviewer.review(&token).await?;
    if !review.is_authenticated() {
        return Err(AuthProxyError::Unauthenticated {
            reason: review.status.error,
        });
    }

    let user = review.status.user;
    log.set_user(user.username.as_str());
    inject_identity_headers(request.headers_mut(), &user)?;
    request.headers_mut().remove(AUTHORIZATION);

    state
        .forwarder
        .forward(request, remote.map(|addr| addr.ip()))
        .await
}

/// Returns the credential of an `Authorization: Bearer <token>` header.
///
/// The prefix is matched case-sensitively; a missing header, another scheme or
/// an empty token all yield `None`.
#[must_use]
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<BearerToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix(BEARER_PREFIX)?;
    if token.is_empty() {
        return None;
    }
    Some(BearerToken::new(token))
}

/// Sets the forwarded identity headers for `user`.
///
/// Inbound copies of all three headers are removed first, so only verified
/// values reach the backend. Groups are only set when non-empty and the
/// cluster header only when the `cluster-name` attribute has a value.
///
/// # Errors
///
/// Returns [`AuthProxyError::InvalidIdentity`] when a value cannot be carried
/// in a header.
pub fn inject_identity_headers(headers: &mut HeaderMap, user: &UserInfo) -> Result<(), AuthProxyError> {
    for name in [
        HEADER_FORWARDED_USER,
        HEADER_FORWARDED_GROUPS,
        HEADER_FORWARDED_EXTRA_CLUSTER,
    ] {
        headers.remove(name);
    }

    headers.insert(
        HEADER_FORWARDED_USER,
        header_value(HEADER_FORWARDED_USER, &user.username)?,
    );
    if !user.groups.is_empty() {
        headers.insert(
            HEADER_FORWARDED_GROUPS,
            header_value(HEADER_FORWARDED_GROUPS, &user.groups.join(","))?,
        );
    }
    if let Some(cluster) = user.cluster_name() {
        headers.insert(
            HEADER_FORWARDED_EXTRA_CLUSTER,
            header_value(HEADER_FORWARDED_EXTRA_CLUSTER, cluster)?,
        );
    }
    Ok(())
}

fn header_value(header: &'static str, value: &str) -> Result<HeaderValue, AuthProxyError> {
    HeaderValue::from_str(value).map_err(|_| AuthProxyError::InvalidIdentity { header })
}
