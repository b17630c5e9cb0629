//! The `SnapshotStore` trait.
//!
//! Implemented by storage backends (e.g. `epistat-store-sqlite`). The
//! refresh pipeline and the HTTP API depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::snapshot::CountrySnapshot;

/// Abstraction over a snapshot store backend.
///
/// Every write replaces a whole row atomically: a concurrent reader sees
/// either the previous row or the new one, never a mix of fields.
pub trait SnapshotStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert the row for `snapshot.code`, or replace every other field of the
  /// existing row in place. Applying the same upsert twice is a no-op.
  fn upsert(
    &self,
    snapshot: CountrySnapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve the row for `code`. Returns `None` if not found.
  fn get<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<CountrySnapshot>, Self::Error>> + Send + 'a;

  /// All rows, ordered by code.
  fn list(&self) -> impl Future<Output = Result<Vec<CountrySnapshot>, Self::Error>> + Send + '_;

  /// Delete every row and recreate empty storage. There is no undo.
  fn reset_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
