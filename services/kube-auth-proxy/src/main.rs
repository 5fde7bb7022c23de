//! Kube Auth Proxy - Main Entry Point

use std::net::SocketAddr;
use std::process::ExitCode;

use kube_auth_proxy::config::Config;
use kube_auth_proxy::shutdown::wait_for_signal;
use kube_auth_proxy::{ConfigError, server};
use proxy_common::init_tracing;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        // --help / --version and usage errors print themselves
        Err(ConfigError::Args(e)) => e.exit(),
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.tracing_config());

    match run(config).await {
        Ok(()) => {
            info!("Kube Auth Proxy stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        info!("TLS crypto provider already installed");
    }

    info!(version = env!("CARGO_PKG_VERSION"), "starting");
    info!(
        upstream = %config.upstream,
        port = config.port,
        token_review = config.token_review_str(),
        "config"
    );

    let reviewer = config.token_reviewer()?;
    let app = server::build_router(&config, reviewer)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    server::serve(listener, app, wait_for_signal()).await
}
