//! HTTP server assembly for Lobby: configuration and the middleware stack
//! around [`lobby_api::api_router`].

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::{
  Router,
  extract::DefaultBodyLimit,
  http::{HeaderValue, Method},
  routing::get,
};
use lobby_core::{
  store::{PhotoStore, RecordStore},
  workflow::{DEFAULT_MAX_PHOTO_BYTES, Workflow},
};
use serde::Deserialize;
use tower_http::{
  cors::{AllowOrigin, Any, CorsLayer},
  timeout::TimeoutLayer,
  trace::TraceLayer,
};

/// Room for the visitor JSON part and multipart framing on top of the photo.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LOBBY_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub photo_dir:            PathBuf,
  /// Browser origins allowed to call the API.
  pub cors_origins:         Vec<String>,
  pub request_timeout_secs: u64,
  /// How long a database statement waits for a lock before reporting
  /// contention.
  pub busy_timeout_ms:      u64,
  pub max_photo_bytes:      usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_string(),
      port:                 8080,
      store_path:           PathBuf::from("lobby.db"),
      photo_dir:            PathBuf::from("photos"),
      cors_origins:         vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
      ],
      request_timeout_secs: 30,
      busy_timeout_ms:      5_000,
      max_photo_bytes:      DEFAULT_MAX_PHOTO_BYTES,
    }
  }
}

impl ServerConfig {
  /// Layer the TOML file at `path` (optional) under `LOBBY_*` environment
  /// variables. `LOBBY_CORS_ORIGINS` takes a comma-separated list.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("LOBBY")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("cors_origins"),
      )
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete application: the API under `/api`, a `/health` probe,
/// and tracing, CORS, timeout and body-limit middleware.
pub fn app<S, P>(workflow: Arc<Workflow<S, P>>, cfg: &ServerConfig) -> anyhow::Result<Router>
where
  S: RecordStore + 'static,
  P: PhotoStore + 'static,
{
  let origins = cfg
    .cors_origins
    .iter()
    .map(|o| o.parse::<HeaderValue>())
    .collect::<Result<Vec<_>, _>>()
    .context("invalid entry in cors_origins")?;

  let cors = CorsLayer::new()
    .allow_origin(AllowOrigin::list(origins))
    .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
    .allow_headers(Any);

  Ok(
    Router::new()
      .nest("/api", lobby_api::api_router(workflow))
      .route("/health", get(|| async { "ok" }))
      .layer(DefaultBodyLimit::max(cfg.max_photo_bytes + MULTIPART_OVERHEAD))
      .layer(TimeoutLayer::new(cfg.request_timeout()))
      .layer(cors)
      .layer(TraceLayer::new_for_http()),
  )
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
