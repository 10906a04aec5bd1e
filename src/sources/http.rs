//! Shared HTTP access for the network sources
//!
//! One `reqwest` client with a uniform timeout, plus a fixed-delay throttle
//! so consecutive requests are spaced no closer than `min_delay_ms`.
//! Requests are never retried.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::config::HttpConfig;

/// Fixed-delay scheduler: each call to [`Throttle::wait`] returns no sooner
/// than `min_interval` after the previous one returned.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.min_interval).await;
        }
        self.last = Some(Instant::now());
    }
}

/// HTTP client shared by every network source of a run
pub struct HttpFetcher {
    client: reqwest::Client,
    throttle: Mutex<Throttle>,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            throttle: Mutex::new(Throttle::new(Duration::from_millis(config.min_delay_ms))),
        })
    }

    async fn pace(&self) {
        self.throttle.lock().await.wait().await;
    }

    /// GET and decode JSON; any non-2xx status is an error
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.pace().await;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("GET {} returned {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }

    /// GET and decode JSON; a non-2xx status yields `None`
    pub async fn get_json_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        self.pace().await;
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "No payload");
            return Ok(None);
        }

        let payload = response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))?;
        Ok(Some(payload))
    }

    /// POST a JSON body and decode the JSON reply
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        self.pace().await;
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            bail!("POST {} returned {}", url, response.status());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to decode response from {}", url))
    }
}
