//! RabbitMQ management-API client.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use rmqscale_core::{MetricsProvider, QueueMetrics};

use crate::rate::RateTracker;

/// Errors from the management-API client.
#[derive(Debug, Error)]
pub enum RabbitError {
    #[error("missing rabbit settings: url, user and password are all required")]
    MissingSettings,

    #[error("invalid rabbit url `{0}`: {1}")]
    InvalidUrl(String, String),

    #[error("management API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("management API returned {0}")]
    Status(StatusCode),
}

/// Queue document subset returned by `GET /api/queues/{vhost}/{queue}`.
#[derive(Debug, Deserialize)]
struct QueueResponse {
    #[serde(default)]
    consumers: i64,
    #[serde(default)]
    messages: i64,
    #[serde(default)]
    message_stats: Option<MessageStats>,
}

#[derive(Debug, Default, Deserialize)]
struct MessageStats {
    /// Monotonic total of messages published to the queue.
    #[serde(default)]
    publish: u64,
}

impl QueueResponse {
    fn publish_count(&self) -> u64 {
        self.message_stats.as_ref().map_or(0, |s| s.publish)
    }
}

/// Client for the RabbitMQ management HTTP API.
///
/// Holds a [`RateTracker`] so successive fetches of the same queue
/// yield a publish-rate sample alongside the instantaneous depth and
/// consumer count.
pub struct RabbitClient {
    http: reqwest::Client,
    base: Url,
    user: String,
    password: String,
    rates: Mutex<RateTracker>,
}

impl RabbitClient {
    /// Build a client. All three settings are required.
    pub fn new(url: &str, user: &str, password: &str) -> Result<Self, RabbitError> {
        if url.is_empty() || user.is_empty() || password.is_empty() {
            return Err(RabbitError::MissingSettings);
        }
        let base = Url::parse(url)
            .map_err(|e| RabbitError::InvalidUrl(url.to_string(), e.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
            user: user.to_string(),
            password: password.to_string(),
            rates: Mutex::new(RateTracker::new()),
        })
    }

    async fn fetch(
        &self,
        queue: &str,
        vhost: &str,
        window_secs: u64,
    ) -> Result<QueueMetrics, RabbitError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                RabbitError::InvalidUrl(self.base.to_string(), "cannot be a base".to_string())
            })?
            .extend(["api", "queues", vhost, queue]);

        let response = self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RabbitError::Status(response.status()));
        }

        let body: QueueResponse = response.json().await?;
        let published = {
            let key = format!("{vhost}/{queue}");
            let mut rates = self.rates.lock().await;
            rates.observe(&key, body.publish_count(), epoch_ms(), window_secs)
        };

        debug!(
            queue,
            vhost,
            consumers = body.consumers,
            depth = body.messages,
            published,
            "queue sampled"
        );

        Ok(QueueMetrics {
            consumers: body.consumers,
            depth: body.messages,
            published,
        })
    }
}

#[async_trait]
impl MetricsProvider for RabbitClient {
    async fn queue_metrics(
        &self,
        queue: &str,
        vhost: &str,
        window_secs: u64,
    ) -> anyhow::Result<QueueMetrics> {
        Ok(self.fetch(queue, vhost, window_secs).await?)
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
