// src/main.rs
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

use rust_round_robin_proxy::{
    config,
    proxy::{BackendPool, Dispatcher, HttpForwarder},
    server::{RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_round_robin_proxy=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration; built-in pool when no file is given
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    match &config_path {
        Some(path) => info!("Loading configuration from: {}", path.display()),
        None => info!("No configuration file given, using built-in defaults"),
    }
    let config = config::load(config_path.as_deref()).await?;

    // An unusable pool must stop us before the listener exists.
    let pool = Arc::new(
        BackendPool::from_config(&config.backends).context("Invalid backend pool")?,
    );

    let forwarder = Arc::new(HttpForwarder::new(config.upstream.connect_timeout()));
    let dispatcher = Arc::new(
        Dispatcher::new(pool, forwarder).with_timeout(config.upstream.timeout()),
    );
    let handler = RequestHandler::new(dispatcher);

    let addr = config.listen_addr();
    info!("Load Balancer running on port {}", addr.port());

    ServerBuilder::new(addr)
        .with_handler(handler)
        .serve(shutdown_signal())
        .await?;

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(%err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(%err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
