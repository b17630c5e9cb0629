//! Handler for `GET /graph`.

use axum::{
  extract::{Query, State},
  http::header,
  response::IntoResponse,
};
use epistat_core::chart::{ChartStore, is_valid_code};

use crate::{AppState, country::CodeParams, error::ApiError};

/// `GET /graph?iso2=<code>` — the stored PNG for `code`.
pub async fn get_one<S, C>(
  State(state): State<AppState<S, C>>,
  Query(params): Query<CodeParams>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Send + Sync,
  C: ChartStore,
{
  let code = params.require()?;
  if !is_valid_code(&code) {
    return Err(ApiError::NotFound("Graph not found".to_string()));
  }
  let png = state
    .charts
    .load(&code)
    .await
    .map_err(ApiError::chart)?
    .ok_or_else(|| ApiError::NotFound("Graph not found".to_string()))?;
  Ok(([(header::CONTENT_TYPE, "image/png")], png))
}
