//! Single-host forwarding transport.
//!
//! Requests are rewritten onto the backend URL and relayed over a pooled
//! hyper client. Bodies stream through in both directions.

use axum::body::Body;
use axum::http::header::CONNECTION;
use axum::http::{HeaderMap, HeaderValue, Request, Response, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use proxy_common::PlatformError;
use std::net::IpAddr;
use tracing::{debug, instrument};
use url::Url;

use crate::error::AuthProxyError;

/// Headers that describe a single connection and are never relayed.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Relays requests to one backend.
#[derive(Clone)]
pub struct Forwarder {
    origin: String,
    base_path: String,
    base_query: String,
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Forwarder {
    /// Forwarder for the backend at `target` (`http` or `https`).
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidInput`] when `target` has no host or the
    /// TLS configuration cannot be built.
    pub fn new(target: &Url) -> Result<Self, PlatformError> {
        let host = target
            .host_str()
            .ok_or_else(|| PlatformError::invalid_input(format!("upstream {target} has no host")))?;
        let origin = match target.port() {
            Some(port) => format!("{}://{host}:{port}", target.scheme()),
            None => format!("{}://{host}", target.scheme()),
        };

        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| PlatformError::invalid_input(format!("TLS configuration: {e}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            origin,
            base_path: target.path().to_string(),
            base_query: target.query().unwrap_or_default().to_string(),
            client,
        })
    }

    /// Backend scheme and authority, e.g. `http://backend:8080`.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Maps an inbound request URI onto the backend.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProxyError::Internal`] if the joined URI is not valid.
    pub fn target_uri(&self, inbound: &Uri) -> Result<Uri, AuthProxyError> {
        let path = join_path(&self.base_path, inbound.path());
        let query = join_query(&self.base_query, inbound.query().unwrap_or_default());
        let uri = if query.is_empty() {
            format!("{}{path}", self.origin)
        } else {
            format!("{}{path}?{query}", self.origin)
        };
        Uri::try_from(uri).map_err(|e| AuthProxyError::Internal(e.into()))
    }

    /// Sends `request` to the backend and returns its streaming response.
    ///
    /// `client_ip` is appended to `X-Forwarded-For` when known.
    ///
    /// # Errors
    ///
    /// Returns [`AuthProxyError::Upstream`] when the backend cannot be reached.
    #[instrument(skip_all, fields(upstream = %self.origin))]
    pub async fn forward(
        &self,
        mut request: Request<Body>,
        client_ip: Option<IpAddr>,
    ) -> Result<Response<Body>, AuthProxyError> {
        *request.uri_mut() = self.target_uri(request.uri())?;
        remove_hop_by_hop_headers(request.headers_mut());
        if let Some(ip) = client_ip {
            append_forwarded_for(request.headers_mut(), ip);
        }

        debug!(uri = %request.uri(), "forwarding request");
        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| AuthProxyError::Upstream {
                reason: format!("{e:?}"),
            })?;

        let (mut parts, body) = response.into_parts();
        remove_hop_by_hop_headers(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}

/// Joins two path segments with exactly one `/` between them.
#[must_use]
pub fn join_path(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

/// Joins two raw query strings with `&` when both are present.
#[must_use]
pub fn join_query(base: &str, query: &str) -> String {
    if base.is_empty() || query.is_empty() {
        format!("{base}{query}")
    } else {
        format!("{base}&{query}")
    }
}

/// Removes hop-by-hop headers, including those listed in `Connection`.
pub fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(*name);
    }
}

/// Appends `ip` to any `X-Forwarded-For` chain already on the request.
pub fn append_forwarded_for(headers: &mut HeaderMap, ip: IpAddr) {
    let prior: Vec<&str> = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .collect();
    let chain = if prior.is_empty() {
        ip.to_string()
    } else {
        format!("{}, {ip}", prior.join(", "))
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
