// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::SourceConfig;

/// Create the client used to fetch the listing page.
pub fn create_client(config: &SourceConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a client without a request timeout.
///
/// Model and webhook calls are left unbounded; only the page fetch is timed.
pub fn create_plain_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().build()?)
}
