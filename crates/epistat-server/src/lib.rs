//! Configuration for the epistat server binary.
//!
//! Settings come from an optional TOML file layered under environment
//! variables. A bare `PORT` overrides the file's port, and `EPISTAT_*`
//! variables override everything (nested keys use `__`, e.g.
//! `EPISTAT_UPSTREAM__BASE_URL`). Every key has a default.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, bail};
use epistat_api::AuthConfig;
use epistat_chart::ChartOptions;
use epistat_refresh::RefreshConfig;
use epistat_upstream::UpstreamConfig;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub database_path:       PathBuf,
  pub images_dir:          PathBuf,
  pub chart_width:         u32,
  pub chart_height:        u32,
  /// Username for `/reset`. Leave unset (with the hash) to keep it open.
  pub admin_username:      Option<String>,
  /// argon2 PHC string; generate with `epistat --hash-password`.
  pub admin_password_hash: Option<String>,
  pub upstream:            UpstreamConfig,
  pub refresh:             RefreshConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "0.0.0.0".to_string(),
      port:                5000,
      database_path:       PathBuf::from("database.db"),
      images_dir:          PathBuf::from("images"),
      chart_width:         ChartOptions::default().width,
      chart_height:        ChartOptions::default().height,
      admin_username:      None,
      admin_password_hash: None,
      upstream:            UpstreamConfig::default(),
      refresh:             RefreshConfig::default(),
    }
  }
}

impl ServerConfig {
  /// Load from `path` (if it exists) and the process environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    Self::load_with_env(path, std::env::vars().collect())
  }

  fn load_with_env(path: &Path, env: config::Map<String, String>) -> anyhow::Result<Self> {
    let bare_port: config::Map<String, String> =
      env.get("PORT").map(|port| ("PORT".to_string(), port.clone())).into_iter().collect();

    let cfg: ServerConfig = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::default().source(Some(bare_port)))
      .add_source(
        config::Environment::with_prefix("EPISTAT")
          .prefix_separator("_")
          .separator("__")
          .source(Some(env)),
      )
      .build()
      .and_then(|settings| settings.try_deserialize())
      .with_context(|| format!("invalid configuration (file {path:?} and environment)"))?;

    Ok(Self {
      database_path: home_relative(cfg.database_path),
      images_dir: home_relative(cfg.images_dir),
      ..cfg
    })
  }

  pub fn bind_address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn chart_options(&self) -> ChartOptions {
    ChartOptions { width: self.chart_width, height: self.chart_height }
  }

  /// Credentials guarding `/reset`, or `None` when the route is open.
  /// Setting only one of the two keys is an error.
  pub fn admin_auth(&self) -> anyhow::Result<Option<Arc<AuthConfig>>> {
    match (&self.admin_username, &self.admin_password_hash) {
      (Some(username), Some(password_hash)) => Ok(Some(Arc::new(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      }))),
      (None, None) => Ok(None),
      _ => bail!("admin_username and admin_password_hash must be set together"),
    }
  }
}

/// `~/x` → `$HOME/x`; other paths, or no `HOME`, pass through.
fn home_relative(path: PathBuf) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path,
  }
}
