//! Server composition.

use axum::Router;
use axum::routing::get;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::health::health;
use crate::proxy::{Forwarder, ProxyState, proxy_handler};
use crate::review::{CachedTokenReviewer, TokenReviewer};

/// Routes `/healthz` to the liveness responder and everything else through
/// the authenticating proxy.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .fallback(proxy_handler)
        .with_state(state)
}

/// Builds the router for `config`, putting the positive-verdict cache in front
/// of `reviewer`.
///
/// # Errors
///
/// Returns an error if the forwarding client cannot be created.
pub fn build_router<R>(config: &Config, reviewer: R) -> anyhow::Result<Router>
where
    R: TokenReviewer + 'static,
{
    let forwarder = Forwarder::new(&config.upstream)?;
    let reviewer: Arc<dyn TokenReviewer> = Arc::new(CachedTokenReviewer::new(reviewer));
    Ok(router(ProxyState::new(reviewer, forwarder)))
}

/// Serves `app` on `listener` until `shutdown` completes.
///
/// Peer addresses are made available to handlers as
/// [`axum::extract::ConnectInfo`].
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await?;
    Ok(())
}
