//! Handler for `GET /country`.

use axum::{
  Json,
  extract::{Query, State},
};
use epistat_core::{snapshot::CountrySnapshot, store::SnapshotStore};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// Query string shared by `/country` and `/graph`.
#[derive(Debug, Deserialize)]
pub struct CodeParams {
  pub iso2: Option<String>,
}

impl CodeParams {
  pub(crate) fn require(self) -> Result<String, ApiError> {
    self
      .iso2
      .filter(|c| !c.is_empty())
      .ok_or_else(|| ApiError::NotFound("ISO2 required".to_string()))
  }
}

/// Wire shape of a stored snapshot.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryBody {
  pub iso2:      String,
  pub name:      String,
  pub confirmed: i64,
  pub deaths:    i64,
  pub recovered: i64,
  pub active:    i64,
}

impl From<CountrySnapshot> for CountryBody {
  fn from(s: CountrySnapshot) -> Self {
    CountryBody {
      iso2:      s.code,
      name:      s.name,
      confirmed: s.confirmed_total,
      deaths:    s.deaths_total,
      recovered: s.recovered_total,
      active:    s.active_delta,
    }
  }
}

/// `GET /country?iso2=<code>`
pub async fn get_one<S, C>(
  State(state): State<AppState<S, C>>,
  Query(params): Query<CodeParams>,
) -> Result<Json<CountryBody>, ApiError>
where
  S: SnapshotStore,
  C: Send + Sync,
{
  let code = params.require()?;
  let row = state
    .store
    .get(&code)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("Country not found".to_string()))?;
  Ok(Json(row.into()))
}
