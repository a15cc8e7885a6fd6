//! Airtable HTTP Client - Rate-limited REST API Client
//!
//! Wraps reqwest with rate limiting, retries, and bearer authentication
//! for all Airtable REST interactions. Airtable allows 5 requests per
//! second per base and answers 429 for anything faster; the token bucket
//! keeps us under that, the retry loop absorbs the stragglers.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::StoreConfig;

/// Credentials and table coordinates, read from the environment.
#[derive(Debug, Clone)]
pub struct AirtableCredentials {
  /// Personal access token.
  pub api_key: String,
  /// Base identifier (`app...`).
  pub base_id: String,
  /// Table name.
  pub table_name: String,
}

impl AirtableCredentials {
  /// Load credentials from `AIRTABLE_API_KEY`, `AIRTABLE_BASE_ID`,
  /// and `AIRTABLE_TABLE_NAME`.
  pub fn from_env() -> Result<Self> {
    Ok(Self {
      api_key: std::env::var("AIRTABLE_API_KEY")
        .context("AIRTABLE_API_KEY not set")?,
      base_id: std::env::var("AIRTABLE_BASE_ID")
        .context("AIRTABLE_BASE_ID not set")?,
      table_name: std::env::var("AIRTABLE_TABLE_NAME")
        .context("AIRTABLE_TABLE_NAME not set")?,
    })
  }
}

/// Configuration for the Airtable HTTP client.
#[derive(Debug, Clone)]
pub struct AirtableClientConfig {
  /// REST base URL.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Token-bucket budget, requests per second.
  pub requests_per_second: u32,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for AirtableClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.airtable.com/v0".to_string(),
      timeout: Duration::from_secs(30),
      requests_per_second: 5,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl From<&StoreConfig> for AirtableClientConfig {
  fn from(config: &StoreConfig) -> Self {
    Self {
      base_url: config.base_url.clone(),
      timeout: Duration::from_secs(config.timeout_seconds),
      requests_per_second: config.requests_per_second,
      max_retries: config.max_retries,
      retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
    }
  }
}

/// Rate-limited HTTP client for one Airtable table.
pub struct AirtableClient {
  /// Underlying HTTP client.
  http: Client,
  /// Credentials and table coordinates.
  creds: AirtableCredentials,
  /// Client configuration.
  config: AirtableClientConfig,
  /// Token bucket over all table calls.
  throttle: DefaultDirectRateLimiter,
}

impl AirtableClient {
  /// Create a new client for the credentialed table.
  pub fn new(creds: AirtableCredentials, config: AirtableClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let rps = NonZeroU32::new(config.requests_per_second)
      .context("store.requests_per_second must be nonzero")?;

    Ok(Self {
      http,
      creds,
      config,
      throttle: RateLimiter::direct(Quota::per_second(rps)),
    })
  }

  /// The table endpoint URL, with the table name percent-encoded.
  fn table_url(&self) -> Result<Url> {
    let mut url: Url = format!("{}/", self.config.base_url.trim_end_matches('/'))
      .parse()
      .context("Invalid store base URL")?;

    url
      .path_segments_mut()
      .map_err(|()| anyhow::anyhow!("Store base URL cannot be a base"))?
      .pop_if_empty()
      .push(&self.creds.base_id)
      .push(&self.creds.table_name);

    Ok(url)
  }

  /// Execute a select (list) request with query parameters.
  pub async fn select(&self, query: &[(String, String)]) -> Result<Response> {
    let request = self
      .http
      .get(self.table_url()?)
      .bearer_auth(&self.creds.api_key)
      .query(query);
    self.execute_with_retry(request).await
  }

  /// Execute a batch-create request.
  pub async fn create(&self, body: String) -> Result<Response> {
    let request = self
      .http
      .post(self.table_url()?)
      .bearer_auth(&self.creds.api_key)
      .header("Content-Type", "application/json")
      .body(body);
    self.execute_with_retry(request).await
  }

  /// Execute a batch-update request.
  pub async fn update(&self, body: String) -> Result<Response> {
    let request = self
      .http
      .patch(self.table_url()?)
      .bearer_auth(&self.creds.api_key)
      .header("Content-Type", "application/json")
      .body(body);
    self.execute_with_retry(request).await
  }

  /// Execute a batch-delete request for the given record ids.
  pub async fn delete(&self, record_ids: &[String]) -> Result<Response> {
    let query: Vec<(String, String)> = record_ids
      .iter()
      .map(|id| ("records[]".to_string(), id.clone()))
      .collect();

    let request = self
      .http
      .delete(self.table_url()?)
      .bearer_auth(&self.creds.api_key)
      .query(&query);
    self.execute_with_retry(request).await
  }

  /// Execute a request through the token bucket, retrying 429/5xx.
  async fn execute_with_retry(&self, request: RequestBuilder) -> Result<Response> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self.config.retry_base_delay * 2u32.pow(attempt - 1);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      self.throttle.until_ready().await;

      let req = request
        .try_clone()
        .context("Failed to clone request")?;

      match req.send().await {
        Ok(response) => match response.status() {
          StatusCode::OK | StatusCode::CREATED => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by Airtable, backing off");
            sleep(Duration::from_secs(2)).await;
            last_error = Some(anyhow::anyhow!("Rate limited"));
            continue;
          }
          status if status.is_server_error() => {
            warn!(status = %status, "Server error, retrying");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
            continue;
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Airtable error {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = Some(e.into());
          continue;
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }
}
