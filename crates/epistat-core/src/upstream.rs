//! The `Upstream` trait: where catalog and series data come from.

use std::future::Future;

use crate::series::{CatalogEntry, SeriesResponse};

/// A source of country catalogs and per-country series.
pub trait Upstream: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The list of known countries and their identifiers, in upstream order.
  fn fetch_catalog(
    &self,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// The full historical series for the country identified by `slug`.
  fn fetch_series<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<SeriesResponse, Self::Error>> + Send + 'a;
}
