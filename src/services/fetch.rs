// src/services/fetch.rs

//! Listing page fetcher.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;
use crate::utils::http;

/// Source of raw listing page content.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return its body as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET with the configured user agent and timeout.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher from source settings.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            client: http::create_client(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("unexpected status {status}")));
        }

        let body = response.text().await.map_err(|e| AppError::fetch(url, e))?;
        log::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
