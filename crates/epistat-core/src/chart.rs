//! The `ChartStore` trait: rendering and serving per-country charts.

use std::future::Future;

use crate::series::TimeSeriesPoint;

const MAX_CODE_LEN: usize = 16;

/// Whether `code` may key a chart: 1–16 ASCII alphanumerics, `-` or `_`.
/// Anything else could name a path outside an image directory.
pub fn is_valid_code(code: &str) -> bool {
  !code.is_empty()
    && code.len() <= MAX_CODE_LEN
    && code
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Renders series into images and stores them keyed by country code.
///
/// Publishing is a side effect only; it is not transactional with the
/// snapshot row written for the same country.
pub trait ChartStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Render `series` and store the image under `code`, replacing any prior
  /// image for that code.
  fn publish<'a>(
    &'a self,
    code: &'a str,
    series: &'a [TimeSeriesPoint],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// The stored image bytes for `code`. Returns `None` if none exists.
  fn load<'a>(
    &'a self,
    code: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;
}
