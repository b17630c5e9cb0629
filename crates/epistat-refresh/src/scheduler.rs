//! [`Scheduler`] — the background task that repeats refresh passes.

use std::{sync::Arc, time::Duration};

use epistat_core::{chart::ChartStore, store::SnapshotStore, upstream::Upstream};
use tokio::{
  sync::watch,
  task::JoinHandle,
  time::MissedTickBehavior,
};

use crate::{RefreshOutcome, Refresher};

/// Owns the periodic refresh task.
///
/// The first pass starts immediately; later passes start every `period`.
/// Dropping a `Scheduler` without calling [`stop`](Self::stop) also ends the
/// loop, but does not wait for it.
pub struct Scheduler {
  stop:   watch::Sender<bool>,
  handle: JoinHandle<()>,
}

impl Scheduler {
  /// Spawn the refresh loop on the current tokio runtime.
  pub fn start<U, S, C>(refresher: Arc<Refresher<U, S, C>>, period: Duration) -> Self
  where
    U: Upstream + 'static,
    S: SnapshotStore + 'static,
    C: ChartStore + 'static,
  {
    let (stop, mut stopped) = watch::channel(false);
    let period = period.max(Duration::from_secs(1));

    let handle = tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        tokio::select! {
          biased;
          _ = stopped.changed() => break,
          _ = ticker.tick() => {}
        }

        // Stopping cancels an in-flight pass at its next await point. Rows
        // already written stay; the global row may lag until the next pass.
        tokio::select! {
          biased;
          _ = stopped.changed() => break,
          outcome = refresher.run_refresh() => {
            if let RefreshOutcome::Completed(report) = outcome
              && report.catalog_failed
            {
              tracing::warn!("refresh pass fetched no catalog; will retry next interval");
            }
          }
        }
      }
      tracing::info!("refresh scheduler stopped");
    });

    tracing::info!(period_secs = period.as_secs(), "refresh scheduler started");
    Self { stop, handle }
  }

  /// Signal the loop to exit and wait for it.
  pub async fn stop(self) {
    let _ = self.stop.send(true);
    if let Err(e) = self.handle.await {
      tracing::error!(error = %e, "refresh scheduler task panicked");
    }
  }
}
