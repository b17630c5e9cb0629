//! HTTP client for the upstream statistics provider.
//!
//! Implements [`epistat_core::upstream::Upstream`] over `reqwest`, with a
//! per-request timeout and bounded retry for transient failures.

mod client;

pub mod error;

pub use client::{HttpUpstream, UpstreamConfig};
pub use error::{Error, Result};
