//! Serve command - HTTP server plus the replenishment ticker

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::api::create_app;
use crate::config::AppConfig;
use crate::infrastructure::license::Replenisher;
use crate::infrastructure::observability::{init_metrics, init_tracing, shutdown_tracing};

/// Run the server until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("invalid configuration")?;
    init_tracing(&config.logging, &config.observability.tracing);

    let (state, licenses) = crate::create_app_state(&config)?;

    let summary = licenses
        .maintain()
        .await
        .with_context(|| format!("failed to prepare {}", config.licenses.store_path.display()))?;
    info!(
        retained = summary.retained,
        pruned = summary.pruned,
        created = summary.created,
        "License store ready"
    );

    let replenisher =
        Replenisher::new(licenses, config.licenses.replenish_interval()).spawn();

    let metrics = init_metrics(&config.observability.metrics)
        .map(|m| (m, config.observability.metrics.path.as_str()));
    let app = create_app(state, &config.server.static_dir, metrics);

    let addr = build_socket_addr(&config)?;
    info!("Starting server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    replenisher.abort();
    shutdown_tracing();
    info!("Server shutdown complete");

    Ok(())
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
