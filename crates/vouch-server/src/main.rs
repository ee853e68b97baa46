//! vouch-server binary.
//!
//! Reads `vouch.toml` (or the path given with `--config`) plus `VOUCH_*`
//! environment overrides, opens the SQLite session store, and either serves
//! the JSON API or drives a single check to completion.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vouch_clients::{OktaClient, OnfidoClient};
use vouch_core::{directory::IdentityDirectory, subject::Subject};
use vouch_server::{DirectoryConfig, ServerConfig};
use vouch_store_sqlite::SqliteStore;
use vouch_workflow::{FixedInterval, Orchestrator};

#[derive(Parser)]
#[command(author, version, about = "Identity verification workflow server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vouch.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Poll one check until its result is reconciled.
  Watch {
    #[arg(long)]
    check_id: String,
  },
  /// Add or update a subject in the local directory.
  AddSubject {
    key:         String,
    #[arg(long)]
    given_name:  String,
    #[arg(long)]
    family_name: String,
    #[arg(long)]
    email:       String,
  },
  /// Delete finished sessions past the retention period and exit.
  Purge,
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

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let command = cli.command.unwrap_or(Command::Serve);

  let provider = OnfidoClient::new(cfg.provider.clone()).context("invalid provider config")?;

  match cfg.directory.clone() {
    DirectoryConfig::Okta(okta) => {
      let directory = OktaClient::new(okta).context("invalid directory config")?;
      run(command, &cfg, provider, directory, store).await
    }
    DirectoryConfig::Sqlite => run(command, &cfg, provider, store.clone(), store).await,
  }
}

async fn run<D>(
  command: Command,
  cfg: &ServerConfig,
  provider: OnfidoClient,
  directory: D,
  sessions: SqliteStore,
) -> anyhow::Result<()>
where
  D: IdentityDirectory + 'static,
{
  let store = sessions.clone();
  let orchestrator = Arc::new(Orchestrator::with_config(
    provider,
    directory,
    sessions,
    cfg.workflow(),
  ));

  match command {
    Command::Serve => {
      let purge_every = cfg
        .session_retention()
        .clamp(Duration::from_secs(60), Duration::from_secs(60 * 60));
      vouch_server::spawn_purge(orchestrator.clone(), cfg.session_retention(), purge_every);

      let app = vouch_server::router(orchestrator);
      let address = cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Watch { check_id } => {
      let mut timer = FixedInterval::new(orchestrator.config().poll_interval);
      loop {
        match orchestrator.drive_poll(&check_id, &mut timer).await {
          Ok(outcome) => {
            let result = outcome.result.map(|r| r.to_string()).unwrap_or_default();
            println!("{check_id}: {} {result}", outcome.status);
            break;
          }
          Err(e) if e.is_transient() => {
            tracing::warn!(check_id = %check_id, "poll failed, retrying: {e}");
          }
          Err(e) => return Err(e).with_context(|| format!("watching {check_id}")),
        }
      }
    }
    Command::Purge => {
      let removed = orchestrator
        .purge_terminal(cfg.session_retention())
        .await
        .context("purge failed")?;
      println!("removed {removed} finished sessions");
    }
    Command::AddSubject { key, given_name, family_name, email } => {
      if !matches!(cfg.directory, DirectoryConfig::Sqlite) {
        bail!("add-subject only applies to the sqlite directory backend");
      }
      let subject = Subject {
        subject_key: key,
        given_name,
        family_name,
        email,
        applicant_id: None,
        idv_status: None,
      };
      store.upsert_subject(&subject).await.context("failed to store subject")?;
      tracing::info!(subject_key = %subject.subject_key, "subject saved");
    }
  }

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
