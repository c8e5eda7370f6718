// src/services/notify.rs

//! Notification sinks.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{NotifyConfig, Record};
use crate::services::summary;
use crate::utils::http;

/// Receives the newly discovered announcements.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `records`. Callers treat failure as non-fatal.
    async fn notify(&self, records: &[Record]) -> Result<()>;
}

/// Webhook body: markdown for chat bots that render it, plain text otherwise.
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub msgtype: &'static str,
    pub content: WebhookContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookContent {
    pub text: String,
}

impl WebhookPayload {
    /// Payload announcing `records`.
    pub fn for_records(heading: &str, records: &[Record]) -> Self {
        Self {
            msgtype: "markdown",
            content: WebhookContent {
                text: summary::markdown(heading, records),
            },
            text: Some(summary::plain(records)),
        }
    }

    /// Payload carrying a single fixed markdown message.
    pub fn message(markdown: impl Into<String>) -> Self {
        Self {
            msgtype: "markdown",
            content: WebhookContent {
                text: markdown.into(),
            },
            text: None,
        }
    }
}

/// Posts summaries to a chat webhook.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: String,
    heading: String,
}

impl WebhookNotifier {
    pub fn new(webhook_url: impl Into<String>, heading: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http::create_plain_client()?,
            webhook_url: webhook_url.into(),
            heading: heading.into(),
        })
    }

    /// Build from config; `None` when no webhook is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Option<Self>> {
        match &config.webhook_url {
            Some(url) => Ok(Some(Self::new(url, &config.heading)?)),
            None => Ok(None),
        }
    }

    /// Post an arbitrary payload.
    pub async fn post(&self, payload: &WebhookPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::notify(format!("webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notify(format!("webhook returned status {status}")));
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!("Webhook response: {}", body);
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, records: &[Record]) -> Result<()> {
        self.post(&WebhookPayload::for_records(&self.heading, records))
            .await
    }
}
