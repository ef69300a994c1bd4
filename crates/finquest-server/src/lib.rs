//! HTTP server wiring for finquest.
//!
//! Loads [`ServerConfig`], builds the [`StreakGuard`], and mounts the API
//! under `/api` with request tracing.

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use finquest_core::{policy::StreakPolicy, store::ProgressStore};
use finquest_engine::{StreakGuard, sink::TracingSink};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Prefix for environment overrides, e.g. `FINQUEST_PORT=8080` or
/// `FINQUEST_POLICY__COOLDOWN_HOURS=12`.
pub const ENV_PREFIX: &str = "FINQUEST";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Emit one structured log line per streak decision.
  #[serde(default)]
  pub analytics_enabled: bool,
  #[serde(default)]
  pub policy:            StreakPolicy,
}

impl ServerConfig {
  /// Layer an optional TOML file under `FINQUEST_`-prefixed environment
  /// variables. Nested keys use `__`.
  pub fn load(file: PathBuf) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(file).required(false))
      .add_source(
        config::Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Guard ────────────────────────────────────────────────────────────────────

/// Build the streak guard for `store` as configured.
pub fn build_guard<S>(store: Arc<S>, config: &ServerConfig) -> Arc<StreakGuard<S>>
where
  S: ProgressStore + 'static,
{
  let guard = StreakGuard::new(store, config.policy.clone());
  let guard = if config.analytics_enabled {
    guard.with_sink(Arc::new(TracingSink))
  } else {
    guard
  };
  Arc::new(guard)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level axum [`Router`].
pub fn router<S>(guard: Arc<StreakGuard<S>>) -> Router
where
  S: ProgressStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .nest("/api", finquest_api::api_router(guard))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}
