use crate::config::Config;
use crate::sample::Sample;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Body the ThingSpeak update API returns when it refuses an entry.
const REJECTED_BODY: &str = "0";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("ingestion endpoint rejected the update")]
    Rejected,
    #[error("ingestion endpoint returned HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("ingestion request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Destination for collected samples.
///
/// Returns the ingestion entry id on success. Failures are logged by the
/// implementation and reported as `None`, never retried.
pub trait SampleSink {
    fn publish(&self, sample: &Sample) -> impl Future<Output = Option<String>> + Send;
}

/// Posts samples to a ThingSpeak channel `update` endpoint.
#[derive(Debug, Clone)]
pub struct ThingSpeakPublisher {
    client: Client,
    url: Url,
    api_key: String,
}

impl ThingSpeakPublisher {
    pub fn new(url: Url, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build ingestion HTTP client")?;
        Ok(Self {
            client,
            url,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.update_url.clone(),
            config.api_key.clone(),
            config.publish_timeout,
        )
    }

    pub async fn try_publish(&self, sample: &Sample) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.url.clone())
            .form(&update_form(&self.api_key, sample))
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        interpret_update_response(status, &body)
    }
}

impl SampleSink for ThingSpeakPublisher {
    async fn publish(&self, sample: &Sample) -> Option<String> {
        match self.try_publish(sample).await {
            Ok(entry_id) => {
                tracing::info!(entry_id = %entry_id, "sent sample to ThingSpeak");
                Some(entry_id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to send sample to ThingSpeak");
                None
            }
        }
    }
}

/// `api_key` followed by `field1`..`field8`.
pub fn update_form(api_key: &str, sample: &Sample) -> Vec<(&'static str, String)> {
    let mut form = Vec::with_capacity(9);
    form.push(("api_key", api_key.to_string()));
    form.extend(sample.channel_fields());
    form
}

/// Success is HTTP 200 with any trimmed body other than `"0"`; the body is
/// the new entry id.
pub fn interpret_update_response(status: StatusCode, body: &str) -> Result<String, PublishError> {
    let trimmed = body.trim();
    if status != StatusCode::OK {
        return Err(PublishError::Status {
            status,
            body: trimmed.to_string(),
        });
    }
    if trimmed == REJECTED_BODY {
        return Err(PublishError::Rejected);
    }
    Ok(trimmed.to_string())
}
