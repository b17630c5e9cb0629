//! The refresh pipeline and its daily scheduler.
//!
//! [`Refresher`] runs one pass over the upstream catalog, deriving and
//! storing a snapshot per country and finally the `GBL` aggregate.
//! [`Scheduler`] owns the background task that repeats the pass on a fixed
//! interval.

mod refresher;
mod scheduler;

pub use refresher::{
  DerivationPolicy, RefreshConfig, RefreshOutcome, RefreshReport, Refresher, SkipReason,
  Skipped,
};
pub use scheduler::Scheduler;

#[cfg(test)]
mod tests;
