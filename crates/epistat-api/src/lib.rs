//! HTTP read API for epistat.
//!
//! Exposes an axum [`Router`] backed by any
//! [`SnapshotStore`](epistat_core::store::SnapshotStore) and
//! [`ChartStore`](epistat_core::chart::ChartStore).
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/country?iso2=<code>` | JSON snapshot; 404 if unknown or missing |
//! | `GET`  | `/graph?iso2=<code>`   | `image/png`; 404 if no image |
//! | `GET`  | `/reset`               | Clears all rows; see [`auth`] |
//! | `GET`  | `/health`              | Liveness |

pub mod admin;
pub mod auth;
pub mod country;
pub mod error;
pub mod graph;

use std::sync::Arc;

use axum::{Router, routing::get};
use epistat_core::{chart::ChartStore, store::SnapshotStore};
use tower_http::trace::TraceLayer;

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, C> {
  pub store:  Arc<S>,
  pub charts: Arc<C>,
  /// Credentials for `/reset`. `None` leaves the route open.
  pub admin:  Option<Arc<AuthConfig>>,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      charts: self.charts.clone(),
      admin:  self.admin.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: SnapshotStore + 'static,
  C: ChartStore + 'static,
{
  Router::new()
    .route("/country", get(country::get_one::<S, C>))
    .route("/graph", get(graph::get_one::<S, C>))
    .route("/reset", get(admin::reset::<S, C>))
    .route("/health", get(admin::health))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
