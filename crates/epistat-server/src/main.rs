//! epistat server binary.
//!
//! `epistat` (or `epistat serve`) reads `config.toml` or the file given with
//! `--config`, opens the SQLite snapshot store and image directory, starts
//! the daily refresh scheduler and serves the read API until interrupted.
//!
//! `epistat hash-password` reads one line from stdin and prints the argon2
//! PHC string to use as `admin_password_hash`.

use std::{io::BufRead as _, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context as _, anyhow};
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::{Parser, Subcommand};
use epistat_api::AppState;
use epistat_chart::ImageDir;
use epistat_core::store::SnapshotStore;
use epistat_refresh::{Refresher, Scheduler};
use epistat_server::ServerConfig;
use epistat_store_sqlite::SqliteStore;
use epistat_upstream::HttpUpstream;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Pandemic statistics refresh service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Refresh on schedule and serve the HTTP API (the default).
  Serve,
  /// Hash a password read from stdin for `admin_password_hash`.
  HashPassword,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  match cli.command.unwrap_or(Command::Serve) {
    Command::HashPassword => print_password_hash(),
    Command::Serve => serve(ServerConfig::load(&cli.config)?).await,
  }
}

fn print_password_hash() -> anyhow::Result<()> {
  eprint!("Password: ");
  let password = std::io::stdin()
    .lock()
    .lines()
    .next()
    .context("no password on stdin")??;

  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| anyhow!("argon2: {e}"))?;
  println!("{hash}");
  Ok(())
}

async fn serve(cfg: ServerConfig) -> anyhow::Result<()> {
  let admin = cfg.admin_auth()?;
  if admin.is_none() {
    tracing::warn!("no admin credentials configured; GET /reset is unauthenticated");
  }

  let store = SqliteStore::open(&cfg.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.database_path))?;
  let store = Arc::new(store);
  let existing = store.list().await.context("failed to read store")?.len();
  tracing::info!(path = ?cfg.database_path, rows = existing, "snapshot store ready");

  let charts = ImageDir::open(&cfg.images_dir, cfg.chart_options())
    .await
    .with_context(|| format!("failed to prepare image directory {:?}", cfg.images_dir))?;
  let charts = Arc::new(charts);

  let upstream = HttpUpstream::new(cfg.upstream.clone()).context("failed to build upstream client")?;
  tracing::info!(base_url = %cfg.upstream.base_url, "upstream configured");

  let refresher = Arc::new(Refresher::new(
    Arc::new(upstream),
    store.clone(),
    charts.clone(),
    cfg.refresh.on_derivation_error,
  ));
  let scheduler = Scheduler::start(refresher, Duration::from_secs(cfg.refresh.interval_secs));

  let app = epistat_api::router(AppState { store, charts, admin });
  let address = cfg.bind_address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error");

  scheduler.stop().await;
  served
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}
