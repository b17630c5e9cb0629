//! [`Refresher`] — one pass of fetch, derive, upsert and chart.

use std::sync::Arc;

use epistat_core::{
  chart::ChartStore,
  derive::derive_metrics,
  series::CatalogEntry,
  snapshot::{CountrySnapshot, GlobalTotals},
  store::SnapshotStore,
  upstream::Upstream,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

// ─── Configuration ────────────────────────────────────────────────────────────

/// What to do when a country's non-empty series cannot be turned into
/// metrics (too few points, missing fields).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivationPolicy {
  /// Stop the pass; countries after the failing one keep their previous
  /// rows. The global row is still written with the totals so far.
  #[default]
  Abort,
  /// Log the failure and carry on with the next country.
  Skip,
}

/// Scheduling and failure-policy settings for the refresh task.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
  /// Seconds between the starts of consecutive passes.
  pub interval_secs:       u64,
  pub on_derivation_error: DerivationPolicy,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      interval_secs:       24 * 60 * 60,
      on_derivation_error: DerivationPolicy::Abort,
    }
  }
}

// ─── Report ───────────────────────────────────────────────────────────────────

/// Why a catalog entry produced no row this pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
  #[error("no data")]
  NoData,
  #[error("fetch failed: {0}")]
  FetchFailed(String),
  #[error("derivation failed: {0}")]
  DeriveFailed(#[from] epistat_core::Error),
  #[error("store write failed: {0}")]
  StoreFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
  pub slug:   String,
  pub reason: SkipReason,
}

/// What one refresh pass did.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
  /// Codes whose rows were written, in processing order.
  pub updated:        Vec<String>,
  pub skipped:        Vec<Skipped>,
  /// Codes whose row was written but whose chart failed.
  pub chart_failures: Vec<String>,
  /// Slug of the country whose derivation error stopped the pass.
  pub aborted_at:     Option<String>,
  /// The catalog could not be fetched; nothing was written.
  pub catalog_failed: bool,
  /// The aggregate row, if it was written.
  pub global:         Option<CountrySnapshot>,
}

#[derive(Debug)]
pub enum RefreshOutcome {
  Completed(RefreshReport),
  /// Another pass was already running; this one did nothing.
  Busy,
}

// ─── Refresher ────────────────────────────────────────────────────────────────

/// Runs refresh passes against an upstream, a snapshot store and a chart
/// store. At most one pass runs at a time.
pub struct Refresher<U, S, C> {
  upstream: Arc<U>,
  store:    Arc<S>,
  charts:   Arc<C>,
  policy:   DerivationPolicy,
  running:  Mutex<()>,
}

impl<U, S, C> Refresher<U, S, C>
where
  U: Upstream,
  S: SnapshotStore,
  C: ChartStore,
{
  pub fn new(upstream: Arc<U>, store: Arc<S>, charts: Arc<C>, policy: DerivationPolicy) -> Self {
    Self { upstream, store, charts, policy, running: Mutex::new(()) }
  }

  /// Run one full pass. Never fails: every problem is logged and recorded in
  /// the returned report.
  pub async fn run_refresh(&self) -> RefreshOutcome {
    let Ok(_guard) = self.running.try_lock() else {
      tracing::warn!("refresh already in progress; skipping this run");
      return RefreshOutcome::Busy;
    };

    tracing::info!("Updating database ...");
    let report = self.refresh_pass().await;
    tracing::info!(
      updated = report.updated.len(),
      skipped = report.skipped.len(),
      aborted = report.aborted_at.is_some(),
      "Update complete ..."
    );
    RefreshOutcome::Completed(report)
  }

  async fn refresh_pass(&self) -> RefreshReport {
    let mut report = RefreshReport::default();

    let mut catalog: Vec<CatalogEntry> = match self.upstream.fetch_catalog().await {
      Ok(c) => c,
      Err(e) => {
        tracing::error!(error = %e, "failed to fetch country catalog; nothing refreshed");
        report.catalog_failed = true;
        return report;
      }
    };
    catalog.sort_by(|a, b| a.country.cmp(&b.country));

    let mut totals = GlobalTotals::default();

    for entry in &catalog {
      let slug = entry.slug.as_str();

      let response = match self.upstream.fetch_series(slug).await {
        Ok(r) => r,
        Err(e) => {
          tracing::warn!(slug, error = %e, "series fetch failed; skipping country");
          report.skip(slug, SkipReason::FetchFailed(e.to_string()));
          continue;
        }
      };

      let Some(series) = response.points() else {
        tracing::info!(slug, "no series data; skipping country");
        report.skip(slug, SkipReason::NoData);
        continue;
      };

      let metrics = match derive_metrics(&series) {
        Ok(m) => m,
        Err(e) => {
          tracing::error!(slug, error = %e, payload = %response.raw(), "cannot derive metrics");
          report.skip(slug, e.into());
          match self.policy {
            DerivationPolicy::Abort => {
              report.aborted_at = Some(slug.to_owned());
              break;
            }
            DerivationPolicy::Skip => continue,
          }
        }
      };

      let snapshot = CountrySnapshot::from_metrics(entry.iso2.clone(), metrics);
      if let Err(e) = self.store.upsert(snapshot.clone()).await {
        tracing::error!(slug, code = %snapshot.code, error = %e, "failed to store snapshot");
        report.skip(slug, SkipReason::StoreFailed(e.to_string()));
        continue;
      }
      totals.add(&snapshot);
      report.updated.push(snapshot.code.clone());

      if let Err(e) = self.charts.publish(&snapshot.code, &series).await {
        tracing::warn!(code = %snapshot.code, error = %e, "failed to render chart");
        report.chart_failures.push(snapshot.code.clone());
      }

      tracing::info!(code = %snapshot.code, "Updated {}", snapshot.name);
    }

    let global = totals.into_snapshot();
    match self.store.upsert(global.clone()).await {
      Ok(()) => report.global = Some(global),
      Err(e) => tracing::error!(error = %e, "failed to store global totals"),
    }

    report
  }
}

impl RefreshReport {
  fn skip(&mut self, slug: &str, reason: SkipReason) {
    self.skipped.push(Skipped { slug: slug.to_owned(), reason });
  }
}
