//! Error type for `epistat-upstream`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  /// Sending the request or reading the body failed, including timeouts.
  #[error("GET {url} failed: {source}")]
  Request {
    url:    String,
    #[source]
    source: reqwest::Error,
  },

  #[error("GET {url} → {status}")]
  Status { url: String, status: u16 },

  /// The whole body arrived but is not the expected JSON.
  #[error("decoding response from {url}: {source}")]
  Decode {
    url:    String,
    #[source]
    source: serde_json::Error,
  },
}

impl Error {
  /// Whether another attempt could plausibly succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Error::Request { .. } => true,
      Error::Status { status, .. } => *status == 429 || *status >= 500,
      Error::Client(_) | Error::Decode { .. } => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
