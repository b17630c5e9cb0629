//! [`HttpUpstream`] — the `reqwest` implementation of [`Upstream`].

use std::time::Duration;

use epistat_core::{
  series::{CatalogEntry, SeriesResponse},
  upstream::Upstream,
};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Connection settings for the upstream provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
  pub base_url:     String,
  /// Per-request timeout, covering connect and body.
  pub timeout_secs: u64,
  /// Total attempts per request, including the first. At least 1.
  pub max_attempts: u32,
  /// Delay before the second attempt; doubles on each further attempt.
  pub backoff_ms:   u64,
}

impl Default for UpstreamConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://api.covid19api.com".to_string(),
      timeout_secs: 30,
      max_attempts: 3,
      backoff_ms:   500,
    }
  }
}

/// Async HTTP client for the upstream catalog and series endpoints.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpUpstream {
  client: Client,
  config: UpstreamConfig,
}

impl HttpUpstream {
  pub fn new(config: UpstreamConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  async fn get_json_once<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(|source| Error::Request { url: url.to_owned(), source })?;

    if !resp.status().is_success() {
      return Err(Error::Status {
        url:    url.to_owned(),
        status: resp.status().as_u16(),
      });
    }

    let body = resp
      .bytes()
      .await
      .map_err(|source| Error::Request { url: url.to_owned(), source })?;
    serde_json::from_slice(&body).map_err(|source| Error::Decode { url: url.to_owned(), source })
  }

  /// `GET url`, retrying transient failures with exponential backoff.
  async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
    let max_attempts = self.config.max_attempts.max(1);
    let mut delay = Duration::from_millis(self.config.backoff_ms);
    let mut attempt = 1;

    loop {
      tracing::debug!(url, attempt, "fetching");
      match self.get_json_once(url).await {
        Ok(body) => return Ok(body),
        Err(e) if e.is_transient() && attempt < max_attempts => {
          tracing::warn!(
            url,
            attempt,
            max_attempts,
            retry_in_ms = delay.as_millis() as u64,
            error = %e,
            "upstream request failed; retrying"
          );
          tokio::time::sleep(delay).await;
          delay = delay.saturating_mul(2);
          attempt += 1;
        }
        Err(e) => return Err(e),
      }
    }
  }
}

impl Upstream for HttpUpstream {
  type Error = Error;

  /// `GET {base_url}/countries`
  async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
    self.get_json(&self.url("/countries")).await
  }

  /// `GET {base_url}/total/country/{slug}`
  async fn fetch_series(&self, slug: &str) -> Result<SeriesResponse> {
    self.get_json(&self.url(&format!("/total/country/{slug}"))).await
  }
}
