//! Error type for `epistat-chart`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid chart code: {0:?}")]
  InvalidCode(String),

  #[error("image encoding error: {0}")]
  Encode(#[from] image::ImageError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("render task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
