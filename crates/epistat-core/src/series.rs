//! Upstream payload shapes: the country catalog and per-country series.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the upstream country catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
  #[serde(rename = "Country")]
  pub country: String,
  #[serde(rename = "Slug")]
  pub slug:    String,
  #[serde(rename = "ISO2")]
  pub iso2:    String,
}

/// One reporting date for one country.
///
/// Every field is optional so a point with gaps still decodes; metric
/// derivation is what rejects incomplete points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimeSeriesPoint {
  #[serde(default)]
  pub country:   Option<String>,
  #[serde(default)]
  pub confirmed: Option<i64>,
  #[serde(default)]
  pub deaths:    Option<i64>,
  #[serde(default)]
  pub recovered: Option<i64>,
  #[serde(default)]
  pub active:    Option<i64>,
  /// RFC 3339 timestamp as sent upstream, e.g. `2021-01-01T00:00:00Z`.
  #[serde(default)]
  pub date:      Option<String>,
}

impl TimeSeriesPoint {
  /// The calendar-date part of [`date`](Self::date).
  pub fn day(&self) -> Option<&str> {
    self.date.as_deref().map(|d| d.get(..10).unwrap_or(d))
  }
}

/// What the per-country endpoint returned, kept verbatim.
///
/// The body is usually a JSON array of per-date records, but countries with
/// no data get an error object instead. Holding the raw value lets callers
/// log exactly what arrived, including fields [`TimeSeriesPoint`] ignores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesResponse(pub Value);

impl SeriesResponse {
  pub fn raw(&self) -> &Value { &self.0 }

  /// The usable points, or `None` when the response is empty or not a
  /// sequence of records.
  pub fn points(&self) -> Option<Vec<TimeSeriesPoint>> {
    match Vec::<TimeSeriesPoint>::deserialize(&self.0) {
      Ok(points) if !points.is_empty() => Some(points),
      _ => None,
    }
  }
}
