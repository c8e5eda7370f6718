//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listing page and HTTP settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Language model extraction settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// History persistence settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Webhook notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Replace the configured webhook when an override is present.
    ///
    /// The CLI feeds `WEBHOOK_URL` through here so a secret never has to live
    /// in the config file.
    pub fn apply_webhook_override(&mut self, webhook_url: Option<String>) {
        if let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) {
            self.notify.webhook_url = Some(url);
        }
    }

    /// Path of the history file under the given storage directory.
    pub fn history_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.storage.history_file)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        validate_http_url("source.target_url", &self.source.target_url)?;
        validate_http_url("source.base_url", &self.source.base_url)?;
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        if self.source.max_content_chars == 0 {
            return Err(AppError::validation(
                "source.max_content_chars must be > 0",
            ));
        }
        if self.extractor.model.trim().is_empty() {
            return Err(AppError::validation("extractor.model is empty"));
        }
        validate_http_url("extractor.api_base", &self.extractor.api_base)?;
        if self.extractor.api_key_env.trim().is_empty() {
            return Err(AppError::validation("extractor.api_key_env is empty"));
        }
        if self.storage.history_file.trim().is_empty() {
            return Err(AppError::validation("storage.history_file is empty"));
        }
        if let Some(url) = &self.notify.webhook_url {
            validate_http_url("notify.webhook_url", url)?;
        }
        Ok(())
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| AppError::validation(format!("{field} is not a valid URL: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::validation(format!(
            "{field} must use http or https, got '{other}'"
        ))),
    }
}

/// Listing page and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Announcement listing page to fetch
    #[serde(default = "defaults::target_url")]
    pub target_url: String,

    /// Domain that relative announcement links are resolved against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for the fetch
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Fetch timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Page content is cut to this many characters before extraction
    #[serde(default = "defaults::max_content_chars")]
    pub max_content_chars: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            target_url: defaults::target_url(),
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_content_chars: defaults::max_content_chars(),
        }
    }
}

/// Language model extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Chat model name
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Base URL of the chat completions API
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "defaults::api_key_env")]
    pub api_key_env: String,

    /// What the announcements are about, used in the prompt
    #[serde(default = "defaults::subject")]
    pub subject: String,

    /// Announcements published before this date are dropped by the model
    #[serde(default)]
    pub cutoff_date: Option<NaiveDate>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model: defaults::model(),
            api_base: defaults::api_base(),
            api_key_env: defaults::api_key_env(),
            subject: defaults::subject(),
            cutoff_date: None,
        }
    }
}

/// History persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// History file name, relative to the storage directory
    #[serde(default = "defaults::history_file")]
    pub history_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_file: defaults::history_file(),
        }
    }
}

/// Webhook notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook endpoint; notifications are skipped when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Heading of the markdown summary
    #[serde(default = "defaults::heading")]
    pub heading: String,

    /// Message sent by the `remind` command
    #[serde(default = "defaults::reminder_text")]
    pub reminder_text: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            heading: defaults::heading(),
            reminder_text: defaults::reminder_text(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn target_url() -> String {
        "https://www.jsxishan.gov.cn/qscjgj/zfxxgk/zfxxgkml_1/spaq/index.shtml".into()
    }
    pub fn base_url() -> String {
        "https://www.jsxishan.gov.cn".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_content_chars() -> usize {
        15_000
    }

    // Extractor defaults
    pub fn model() -> String {
        "gpt-4o-mini".into()
    }
    pub fn api_base() -> String {
        "https://api.openai.com/v1".into()
    }
    pub fn api_key_env() -> String {
        "OPENAI_API_KEY".into()
    }
    pub fn subject() -> String {
        "food safety announcement".into()
    }

    // Storage defaults
    pub fn history_file() -> String {
        "data.json".into()
    }

    // Notify defaults
    pub fn heading() -> String {
        "Food safety bulletin".into()
    }
    pub fn reminder_text() -> String {
        "### 🚨 Reminder: don't forget to fill in the work log".into()
    }
}
