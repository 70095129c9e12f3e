//! # Provisioning Secrets Controller
//!
//! Binary entry point: logging, metrics, the probe server and the watch loop.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use kube::Client;
use tracing::{error, info};

use provisioning_secrets::config::ControllerConfig;
use provisioning_secrets::controller::{run_watch_loop, Context};
use provisioning_secrets::observability;
use provisioning_secrets::server::{start_server, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // Required for rustls 0.23+ when no default provider is set via features
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|provider| anyhow::anyhow!("Failed to install rustls crypto provider: {provider:?}"))?;

    let config = ControllerConfig::from_env();
    config
        .validate()
        .context("Invalid controller configuration")?;
    observability::logging::init_logging(&config)?;
    observability::metrics::register_metrics().context("Failed to register metrics")?;

    info!(
        namespace = %config.target_namespace,
        metrics_port = config.metrics_port,
        "Starting provisioning secrets controller"
    );

    let server_state = Arc::new(ServerState::default());
    let (stop_server, server_stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(start_server(
        config.metrics_port,
        Arc::clone(&server_state),
        async move {
            let _ = server_stopped.await;
        },
    ));

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let ctx = Arc::new(Context::new(client, config));

    run_watch_loop(ctx, server_state).await;

    let _ = stop_server.send(());
    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Probe server error: {}", e),
        Err(e) => error!("Probe server task failed: {}", e),
    }
    Ok(())
}
