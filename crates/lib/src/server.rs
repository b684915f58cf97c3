//! Server wiring: bind the configured address and serve a bridged router until shutdown.

use crate::config::Config;
use anyhow::{Context, Result};
use axum::Router;
use std::future::Future;
use tokio::net::TcpListener;

/// Bind `config.server` and serve `app` until SIGINT or SIGTERM.
pub async fn serve(config: &Config, app: Router) -> Result<()> {
    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("listening on {}", bind_addr);
    serve_with_shutdown(listener, app, shutdown_signal()).await?;
    log::info!("server stopped");
    Ok(())
}

/// Serve `app` on an already-bound listener until `signal` completes, then drain in-flight
/// requests.
pub async fn serve_with_shutdown<F>(listener: TcpListener, app: Router, signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .context("server exited")
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}
