//! Depot Gateway - Artifact registry HTTP API
//!
//! This binary exposes the registry over HTTP: multipart uploads,
//! metadata lookup, and blob downloads.

mod api;

use anyhow::Result;
use api::AppState;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use clap::Parser;
use depot_registry::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "depot-gateway")]
#[command(about = "Depot artifact registry HTTP gateway")]
#[command(version)]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:9443")]
    listen: String,

    /// Registry root directory (blob files + metadata index)
    #[arg(short, long, default_value = "./artifacts")]
    root: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Depot Gateway");

    // Opening the registry loads every durable record into the
    // in-memory mirror; a failure here is fatal.
    let registry = Registry::open(&args.root)?;
    let state = Arc::new(AppState { registry });

    // Matches the multipart memory bound of the upload path.
    let body_limit = DefaultBodyLimit::max(128 * 1024 * 1024);
    info!("Max upload size: 128 MB");

    let app = Router::new()
        .route("/healthz", get(api::health_check))
        .route("/v1/artifacts", post(api::upload_artifact))
        .route("/v1/artifacts", get(api::list_artifacts))
        .route("/v1/artifacts/{id}", get(api::get_artifact))
        .route("/v1/artifacts/{id}/download", get(api::download_artifact))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = args
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", args.listen, e))?;

    info!("API listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Gateway shut down gracefully");

    Ok(())
}
