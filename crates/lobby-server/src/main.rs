//! lobby server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite record store and the photo directory, and serves the visitor API
//! under `/api`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use lobby_core::workflow::Workflow;
use lobby_server::{ServerConfig, expand_tilde};
use lobby_store_sqlite::{PhotoDir, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Lobby visitor management server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open_with_timeout(&store_path, cfg.busy_timeout())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let photo_dir = expand_tilde(&cfg.photo_dir);
  let photos = PhotoDir::open(&photo_dir)
    .await
    .with_context(|| format!("failed to open photo directory {photo_dir:?}"))?;

  let workflow = Workflow::new(Arc::new(store), Arc::new(photos))
    .with_max_photo_bytes(cfg.max_photo_bytes);

  let app = lobby_server::app(Arc::new(workflow), &cfg)?;
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for ctrl-c: {e}");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
