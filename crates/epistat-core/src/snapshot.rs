//! The persisted per-country snapshot row.

use serde::{Deserialize, Serialize};

use crate::derive::DerivedMetrics;

/// Reserved code of the synthetic aggregate row.
pub const GLOBAL_CODE: &str = "GBL";
/// Display name of the synthetic aggregate row.
pub const GLOBAL_NAME: &str = "Global";

/// The latest-known statistics for one country, or for the global aggregate.
///
/// `active_delta` is a day-over-day difference and `recovered_total` is
/// derived from it, so both may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySnapshot {
  pub code:            String,
  pub name:            String,
  pub confirmed_total: i64,
  pub deaths_total:    i64,
  pub recovered_total: i64,
  pub active_delta:    i64,
}

impl CountrySnapshot {
  pub fn from_metrics(code: impl Into<String>, metrics: DerivedMetrics) -> Self {
    Self {
      code:            code.into(),
      name:            metrics.name,
      confirmed_total: metrics.confirmed_total,
      deaths_total:    metrics.deaths_total,
      recovered_total: metrics.recovered_total,
      active_delta:    metrics.active_delta,
    }
  }
}

/// Running totals accumulated across one refresh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GlobalTotals {
  pub confirmed: i64,
  pub deaths:    i64,
  pub recovered: i64,
  pub active:    i64,
}

impl GlobalTotals {
  /// Fold one country's figures into the totals. Saturates on overflow.
  pub fn add(&mut self, snapshot: &CountrySnapshot) {
    self.confirmed = self.confirmed.saturating_add(snapshot.confirmed_total);
    self.deaths = self.deaths.saturating_add(snapshot.deaths_total);
    self.recovered = self.recovered.saturating_add(snapshot.recovered_total);
    self.active = self.active.saturating_add(snapshot.active_delta);
  }

  pub fn into_snapshot(self) -> CountrySnapshot {
    CountrySnapshot {
      code:            GLOBAL_CODE.to_owned(),
      name:            GLOBAL_NAME.to_owned(),
      confirmed_total: self.confirmed,
      deaths_total:    self.deaths,
      recovered_total: self.recovered,
      active_delta:    self.active,
    }
  }
}
