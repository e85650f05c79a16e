//! # Bitbucket Server Controller
//!
//! Watches `AccessKey` and `Webhook` resources and converges them onto the
//! Bitbucket Server named by their `ProviderConfig`.
//!
//! Serves `/metrics`, `/healthz` and `/readyz` on `METRICS_PORT`.

use anyhow::{Context as _, Result};
use bitbucket_server_controller::config::ControllerConfig;
use bitbucket_server_controller::crd::{AccessKey, Webhook};
use bitbucket_server_controller::managed::{OsSecretGenerator, SecretGenerator};
use bitbucket_server_controller::observability::metrics;
use bitbucket_server_controller::runtime::{
    run_watch_loop, BitbucketConnector, Connector, Context,
};
use bitbucket_server_controller::server::{start_server, ServerState};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Crossplane-style controller for Bitbucket Server access keys and webhooks
#[derive(Debug, Parser)]
#[command(name = "bitbucket-server-controller", version, about, long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, env = "DEBUG")]
    debug: bool,

    /// Seconds between reconciliation passes of a healthy resource
    #[arg(long, value_name = "SECONDS")]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Must run before any TLS client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_provider| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let default_filter = if cli.debug {
        "bitbucket_server_controller=debug"
    } else {
        "bitbucket_server_controller=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!("Starting Bitbucket Server Controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let mut config = ControllerConfig::from_env();
    if let Some(poll_interval) = cli.poll_interval {
        config.poll_interval_secs = poll_interval;
    }
    info!(?config, "Loaded controller configuration");

    metrics::register_metrics().context("Failed to register metrics")?;

    let shutdown = CancellationToken::new();
    let server_state = Arc::new(ServerState::default());

    let server = tokio::spawn({
        let state = Arc::clone(&server_state);
        let shutdown = shutdown.clone();
        let port = config.metrics_port;
        async move {
            if let Err(e) = start_server(port, state, shutdown).await {
                error!("HTTP server error: {}", e);
            }
        }
    });

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let secrets: Arc<dyn SecretGenerator> = Arc::new(OsSecretGenerator);
    let connector = Arc::new(BitbucketConnector::new(client.clone(), secrets));
    let access_key_connector: Arc<dyn Connector<AccessKey>> = Arc::clone(&connector) as _;
    let webhook_connector: Arc<dyn Connector<Webhook>> = connector;

    let access_keys = Arc::new(Context::new(
        client.clone(),
        access_key_connector,
        config.clone(),
        shutdown.clone(),
    ));
    let webhooks = Arc::new(Context::new(
        client,
        webhook_connector,
        config,
        shutdown.clone(),
    ));

    tokio::spawn({
        let shutdown = shutdown.clone();
        let server_state = Arc::clone(&server_state);
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal, initiating graceful shutdown...");
            }
            server_state.set_ready(false);
            shutdown.cancel();
        }
    });

    server_state.set_ready(true);
    tokio::join!(run_watch_loop(access_keys), run_watch_loop(webhooks));

    server_state.set_ready(false);
    shutdown.cancel();
    server.await.context("HTTP server task failed")?;

    info!("Controller stopped gracefully");
    Ok(())
}
