use anyhow::Result;
use clap::Parser;
use classroom_zip::classroom::ClassroomClient;
use classroom_zip::config;
use classroom_zip::drive::DriveClient;
use classroom_zip::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let addr = cfg.app.bind_addr()?;

    let state = AppState::new(
        Arc::new(ClassroomClient::from_config(&cfg)?),
        Arc::new(DriveClient::from_config(&cfg)?),
        cfg.pipeline_options(),
    );

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "classroom archive service listening");
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for ctrl_c");
        return;
    }
    info!("received Ctrl+C, shutting down");
}
