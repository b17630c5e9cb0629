//! Metric derivation: turning a raw series into snapshot figures.
//!
//! Only the last two points matter. `active_delta` is the day-over-day
//! change in active cases, and `recovered_total` is defined as
//! `confirmed - (active_delta + deaths)`. That mixes a cumulative total with
//! a daily delta; stored values depend on it, so it is kept literally.

use serde::Serialize;

use crate::{Error, Result, series::TimeSeriesPoint};

/// Figures derived from one country's series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
  pub name:            String,
  pub confirmed_total: i64,
  pub deaths_total:    i64,
  pub active_delta:    i64,
  pub recovered_total: i64,
}

/// Derive snapshot figures from `series`, which must hold at least two
/// points in date order.
pub fn derive_metrics(series: &[TimeSeriesPoint]) -> Result<DerivedMetrics> {
  let len = series.len();
  if len < 2 {
    return Err(Error::TooShort { len });
  }
  let (prev_index, last_index) = (len - 2, len - 1);
  let prev = &series[prev_index];
  let last = &series[last_index];

  let name = last
    .country
    .clone()
    .ok_or(Error::MissingField { field: "Country", index: last_index })?;
  let confirmed_total = required(last.confirmed, "Confirmed", last_index)?;
  let deaths_total = required(last.deaths, "Deaths", last_index)?;
  let last_active = required(last.active, "Active", last_index)?;
  let prev_active = required(prev.active, "Active", prev_index)?;

  let active_delta = last_active
    .checked_sub(prev_active)
    .ok_or(Error::Overflow)?;
  let recovered_total = active_delta
    .checked_add(deaths_total)
    .and_then(|subtrahend| confirmed_total.checked_sub(subtrahend))
    .ok_or(Error::Overflow)?;

  Ok(DerivedMetrics {
    name,
    confirmed_total,
    deaths_total,
    active_delta,
    recovered_total,
  })
}

fn required(value: Option<i64>, field: &'static str, index: usize) -> Result<i64> {
  value.ok_or(Error::MissingField { field, index })
}
