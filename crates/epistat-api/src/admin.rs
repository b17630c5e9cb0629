//! Administrative and liveness routes.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/reset`  | Deletes every stored row; Basic auth when configured |
//! | `GET`  | `/health` | Always `ok` |

use axum::extract::State;
use epistat_core::store::SnapshotStore;

use crate::{AppState, auth::Admin, error::ApiError};

/// `GET /reset` — drop and recreate the snapshot table. Images are kept.
pub async fn reset<S, C>(
  _admin: Admin,
  State(state): State<AppState<S, C>>,
) -> Result<&'static str, ApiError>
where
  S: SnapshotStore,
  C: Send + Sync,
{
  state.store.reset_all().await.map_err(ApiError::store)?;
  tracing::warn!("snapshot store reset via API");
  Ok("Done")
}

/// `GET /health`
pub async fn health() -> &'static str { "ok" }
