//! Server wiring for the verification workflow: configuration, the HTTP
//! router and background maintenance.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, routing::get};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use vouch_clients::{OktaConfig, OnfidoConfig};
use vouch_core::{
  directory::IdentityDirectory, provider::VerificationProvider, store::SessionStore,
};
use vouch_workflow::{DEFAULT_POLL_INTERVAL, Orchestrator, WorkflowConfig};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `vouch.toml` and
/// `VOUCH_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  #[serde(default = "default_poll_interval_secs")]
  pub poll_interval_secs:     u64,
  /// Finished sessions older than this are purged.
  #[serde(default = "default_session_retention_secs")]
  pub session_retention_secs: u64,
  #[serde(default)]
  pub directory:              DirectoryConfig,
  #[serde(default)]
  pub provider:               OnfidoConfig,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("vouch.db") }
fn default_poll_interval_secs() -> u64 { DEFAULT_POLL_INTERVAL.as_secs() }
fn default_session_retention_secs() -> u64 { 7 * 24 * 60 * 60 }

/// Where subjects' identity records live.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum DirectoryConfig {
  Okta(OktaConfig),
  /// The `subjects` table of the local store.
  #[default]
  Sqlite,
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `VOUCH_` environment
  /// variables (`VOUCH_DIRECTORY__BACKEND=okta`).
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path.into()).required(false))
      .add_source(
        config::Environment::with_prefix("VOUCH")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn workflow(&self) -> WorkflowConfig {
    WorkflowConfig { poll_interval: Duration::from_secs(self.poll_interval_secs) }
  }

  pub fn session_retention(&self) -> Duration {
    Duration::from_secs(self.session_retention_secs)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// The full application: `/api` plus a liveness probe, with request tracing.
pub fn router<P, D, S>(orchestrator: Arc<Orchestrator<P, D, S>>) -> Router
where
  P: VerificationProvider + 'static,
  D: IdentityDirectory + 'static,
  S: SessionStore + 'static,
{
  Router::new()
    .route("/healthz", get(|| async { "ok" }))
    .nest("/api", vouch_api::api_router(orchestrator))
    .layer(TraceLayer::new_for_http())
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

/// Purge finished sessions older than `retention` every `every`.
pub fn spawn_purge<P, D, S>(
  orchestrator: Arc<Orchestrator<P, D, S>>,
  retention: Duration,
  every: Duration,
) -> JoinHandle<()>
where
  P: VerificationProvider + 'static,
  D: IdentityDirectory + 'static,
  S: SessionStore + 'static,
{
  tokio::spawn(async move {
    let mut interval = tokio::time::interval(every);
    loop {
      interval.tick().await;
      match orchestrator.purge_terminal(retention).await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "purged finished sessions"),
        Err(e) => tracing::warn!("session purge failed: {e}"),
      }
    }
  })
}
