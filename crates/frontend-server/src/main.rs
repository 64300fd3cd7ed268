mod routes;

use std::time::Duration;

use frontend_core::{RegistryClientConfig, ServerConfig};
use frontend_registry::RegistryClient;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::routes::AppState;

/// How long in-flight responses get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize metrics
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let server_config = ServerConfig::from_env()?;
    let registry_config = RegistryClientConfig::from_env();

    if !server_config.index_file().is_file() {
        tracing::warn!(
            "{} not found, unmatched routes will return 404",
            server_config.index_file().display()
        );
    }

    let state = AppState::new(&registry_config.service_name, handle);
    let app = routes::router(state, &server_config.static_dir);

    let listener = tokio::net::TcpListener::bind(server_config.listen_addr()).await?;
    tracing::info!("Frontend service running on port {}", server_config.port);

    let shutdown = CancellationToken::new();
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    let mut registry = RegistryClient::from_config(registry_config)?;
    if registry.register().await {
        registry.start_heartbeat();
    }

    shutdown_signal().await;

    registry.stop_heartbeat();
    shutdown.cancel();

    wait_for_server(server, SHUTDOWN_GRACE).await;

    Ok(())
}

/// Waits up to `grace` for the server task to drain. Returns `false` when the
/// deadline passed with connections still open.
async fn wait_for_server(server: JoinHandle<std::io::Result<()>>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(e))) => {
            tracing::error!("server error: {}", e);
            true
        }
        Ok(Err(e)) => {
            tracing::error!("server task failed: {}", e);
            true
        }
        Err(_) => {
            tracing::warn!("connections still open after {:?}, exiting anyway", grace);
            false
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SIGINT received, shutting down gracefully"),
        _ = terminate => tracing::info!("SIGTERM received, shutting down gracefully"),
    }
}
