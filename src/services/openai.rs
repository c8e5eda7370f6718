// src/services/openai.rs

//! Chat-completions backed extractor.
//!
//! Sends the instructions as the system message and the page content as the
//! user message, with JSON output mode enabled, then parses the reply with
//! [`parse_announcements`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Config, Record};
use crate::services::extract::{Extractor, parse_announcements, user_message};
use crate::utils::http;

/// Extractor that asks a hosted language model.
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    page_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiExtractor {
    /// Create an extractor for `model` at `api_base`.
    ///
    /// `page_url` is the listing page; relative links the model leaves behind
    /// are resolved against it.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        page_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: http::create_plain_client()?,
            api_key: api_key.into(),
            api_base: api_base.into(),
            model: model.into(),
            page_url: page_url.into(),
        })
    }

    /// Build from config, reading the API key from the configured variable.
    pub fn from_config(config: &Config) -> Result<Self> {
        let var = &config.extractor.api_key_env;
        let api_key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::config(format!("{var} not set")))?;

        Self::new(
            api_key,
            &config.extractor.api_base,
            &config.extractor.model,
            &config.source.target_url,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl Extractor for OpenAiExtractor {
    async fn extract(&self, text: &str, instructions: &str) -> Result<Vec<Record>> {
        let prompt = user_message(text);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        log::debug!("Requesting extraction from model {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::extract(format!("model request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::extract(format!(
                "model returned status {status}: {body}"
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::extract(format!("unreadable model response: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::extract("model response has no content"))?;

        parse_announcements(&content, &self.page_url)
    }
}
