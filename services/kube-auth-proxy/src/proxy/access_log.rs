//! Per-request access log.
//!
//! A [`RequestLog`] is created when a request arrives and writes its record
//! when dropped. The handler moves it into the response body through
//! [`LoggedBody`], so the record is written once the body has been relayed in
//! full, or as soon as the request is abandoned on any earlier path.

use axum::body::{Body, Bytes};
use axum::http::{Method, StatusCode};
use http_body::{Frame, SizeHint};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tracing::info;

/// Completion record of a single request.
#[derive(Debug)]
pub struct RequestLog {
    method: Method,
    path: String,
    remote: Option<SocketAddr>,
    started: Instant,
    status: Option<StatusCode>,
    user: String,
}

impl RequestLog {
    /// Starts timing a request.
    #[must_use]
    pub fn start(method: Method, path: impl Into<String>, remote: Option<SocketAddr>) -> Self {
        Self {
            method,
            path: path.into(),
            remote,
            started: Instant::now(),
            status: None,
            user: String::new(),
        }
    }

    /// Records the verified username.
    pub fn set_user(&mut self, user: impl Into<String>) {
        self.user = user.into();
    }

    /// Records the status written to the client.
    pub const fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// Status recorded so far; `None` until a response has been produced.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Verified username, empty if the request was never authenticated.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Time since the request arrived.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for RequestLog {
    fn drop(&mut self) {
        // 0: abandoned before a response was produced
        let status = self.status.map_or(0, |status| status.as_u16());
        let remote = self.remote.map(|addr| addr.to_string()).unwrap_or_default();
        info!(
            method = %self.method,
            path = %self.path,
            status,
            user = %self.user,
            duration = ?self.elapsed(),
            remote = %remote,
            "request"
        );
    }
}

/// Response body that relays frames unchanged and carries a [`RequestLog`].
///
/// The log is released on end of stream, on a body error, or when the body
/// is dropped unfinished.
pub struct LoggedBody {
    inner: Body,
    log: Option<RequestLog>,
}

impl LoggedBody {
    /// Wraps `inner`, deferring `log` until the body completes.
    #[must_use]
    pub const fn new(inner: Body, log: RequestLog) -> Self {
        Self {
            inner,
            log: Some(log),
        }
    }

    /// Wraps `inner` and converts the result back into an axum [`Body`].
    #[must_use]
    pub fn wrap(inner: Body, log: RequestLog) -> Body {
        Body::new(Self::new(inner, log))
    }
}

impl http_body::Body for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None | Some(Err(_)))) {
            this.log.take();
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
