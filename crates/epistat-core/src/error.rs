//! Error types for `epistat-core`.

use thiserror::Error;

/// Reasons [`derive_metrics`](crate::derive::derive_metrics) can refuse a
/// series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("series has {len} point(s); at least 2 are required")]
  TooShort { len: usize },

  #[error("point {index} is missing field {field:?}")]
  MissingField { field: &'static str, index: usize },

  #[error("arithmetic overflow while deriving metrics")]
  Overflow,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
