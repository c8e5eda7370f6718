// src/services/extract.rs

//! Announcement extraction.
//!
//! The extractor is an oracle: it receives raw page text plus instructions and
//! returns `{title, url, date}` records. Everything here is independent of the
//! backend; `openai.rs` holds the hosted-model implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Config, Record};
use crate::utils::{self, truncate_graphemes};

/// Turns raw page text into announcement records.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract records from `text` following `instructions`.
    async fn extract(&self, text: &str, instructions: &str) -> Result<Vec<Record>>;
}

/// Instructions handed to the extractor alongside the page text.
#[derive(Debug, Clone)]
pub struct ExtractionPrompt {
    subject: String,
    base_url: String,
    cutoff_date: Option<NaiveDate>,
}

impl ExtractionPrompt {
    pub fn new(subject: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            base_url: base_url.into(),
            cutoff_date: None,
        }
    }

    pub fn with_cutoff(mut self, cutoff_date: Option<NaiveDate>) -> Self {
        self.cutoff_date = cutoff_date;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.extractor.subject, &config.source.base_url)
            .with_cutoff(config.extractor.cutoff_date)
    }

    /// Render the system instructions.
    pub fn render(&self) -> String {
        let mut rules = vec![format!(
            "Extract {} titles, links, and publication dates from the HTML.",
            self.subject
        )];
        if let Some(cutoff) = self.cutoff_date {
            rules.push(format!(
                "Only extract announcements published on or after {cutoff}. \
                 Any announcement dated earlier than {cutoff} must be ignored."
            ));
        }
        rules.push(format!(
            "If a link is relative (starts with / or ./ or is just a file name), \
             resolve it to a full absolute URL using the base domain {}.",
            self.base_url
        ));
        rules.push("Dates must use the format YYYY-MM-DD.".to_string());

        let numbered: Vec<String> = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| format!("{}. {}", i + 1, rule))
            .collect();

        format!(
            "You are a helpful assistant that extracts structured data from HTML.\n\
             You must output valid JSON only.\n\
             The JSON must be an object with a key \"announcements\" containing an array of objects.\n\
             Each object must have: \"title\", \"url\", \"date\".\n\n\
             Rules:\n{}",
            numbered.join("\n")
        )
    }
}

/// Bound page content to what the extractor accepts.
pub fn prepare_content(raw: &str, max_chars: usize) -> &str {
    let content = truncate_graphemes(raw, max_chars);
    if content.len() < raw.len() {
        log::debug!(
            "Truncated page content from {} to {} bytes",
            raw.len(),
            content.len()
        );
    }
    content
}

/// User message wrapping the page content.
pub fn user_message(content: &str) -> String {
    format!("Extract the announcement list from this HTML:\n\n{content}")
}

#[derive(Debug, Deserialize)]
struct ExtractionPayload {
    #[serde(default)]
    announcements: Option<Vec<RawAnnouncement>>,
}

#[derive(Debug, Deserialize)]
struct RawAnnouncement {
    title: String,
    url: String,
    date: String,
}

/// Parse extractor JSON output into records.
///
/// A missing or null `announcements` key means nothing was found. Any record
/// with an empty field or a date that is not `YYYY-MM-DD` makes the whole
/// output invalid. Relative URLs are resolved against `page_url`, the listing
/// page they were found on.
pub fn parse_announcements(raw: &str, page_url: &str) -> Result<Vec<Record>> {
    let payload: ExtractionPayload = serde_json::from_str(raw)
        .map_err(|e| AppError::extract(format!("malformed extractor output: {e}")))?;

    let Some(items) = payload.announcements else {
        log::warn!("Extractor output has no announcements field");
        return Ok(Vec::new());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| to_record(i, item, page_url))
        .collect()
}

fn to_record(index: usize, item: RawAnnouncement, page_url: &str) -> Result<Record> {
    let title = item.title.trim();
    let url = item.url.trim();
    let date = item.date.trim();

    if title.is_empty() {
        return Err(AppError::extract(format!("announcement {index} has an empty title")));
    }
    if url.is_empty() {
        return Err(AppError::extract(format!("announcement {index} has an empty url")));
    }
    if !is_iso_date(date) {
        return Err(AppError::extract(format!(
            "announcement {index} has an invalid date '{date}'"
        )));
    }

    Ok(Record::new(title, absolutize(url, page_url), date))
}

fn is_iso_date(date: &str) -> bool {
    date.len() == 10 && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

fn absolutize(url: &str, page_url: &str) -> String {
    match url::Url::parse(url) {
        Ok(_) => url.to_string(),
        Err(_) => utils::resolve(page_url, url).unwrap_or_else(|| url.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://www.example.gov.cn/qscjgj/spaq/index.shtml";

    #[test]
    fn test_parse_valid_output() {
        let raw = r#"{
            "announcements": [
                {"title": "食品安全抽检信息公告（2025年第12期）", "url": "https://www.example.gov.cn/a/1.html", "date": "2025-12-01"},
                {"title": "Second", "url": "https://www.example.gov.cn/a/2.html", "date": "2025-11-28"}
            ]
        }"#;

        let records = parse_announcements(raw, PAGE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title(), "食品安全抽检信息公告（2025年第12期）");
        assert_eq!(records[1].date(), "2025-11-28");
    }

    #[test]
    fn test_parse_resolves_relative_urls() {
        let raw = r#"{"announcements": [
            {"title": "Rel", "url": "/qscjgj/202512/t20251201_1.shtml", "date": "2025-12-01"},
            {"title": "Dot", "url": "./202512/t20251202_2.shtml", "date": "2025-12-02"}
        ]}"#;

        let records = parse_announcements(raw, PAGE).unwrap();
        assert_eq!(
            records[0].url(),
            "https://www.example.gov.cn/qscjgj/202512/t20251201_1.shtml"
        );
        assert_eq!(
            records[1].url(),
            "https://www.example.gov.cn/qscjgj/spaq/202512/t20251202_2.shtml"
        );
    }

    #[test]
    fn test_parse_missing_or_null_key_is_empty() {
        assert!(parse_announcements("{}", PAGE).unwrap().is_empty());
        assert!(
            parse_announcements(r#"{"announcements": null}"#, PAGE)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_parse_rejects_non_json() {
        let err = parse_announcements("Sure! Here are the announcements:", PAGE).unwrap_err();
        assert!(matches!(err, AppError::Extract(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(parse_announcements(r#"[{"title": "x"}]"#, PAGE).is_err());
        assert!(parse_announcements(r#"{"announcements": "none"}"#, PAGE).is_err());
        assert!(
            parse_announcements(
                r#"{"announcements": [{"title": "T", "url": "https://x.gov/1"}]}"#,
                PAGE
            )
            .is_err()
        );
        assert!(
            parse_announcements(
                r#"{"announcements": [{"title": 5, "url": "https://x.gov/1", "date": "2025-12-01"}]}"#,
                PAGE
            )
            .is_err()
        );
    }

    #[test]
    fn test_parse_rejects_bad_dates_and_empty_fields() {
        for date in ["2025/12/01", "2025-2-1", "2025-13-01", "yesterday", ""] {
            let raw = format!(
                r#"{{"announcements": [{{"title": "T", "url": "https://x.gov/1", "date": "{date}"}}]}}"#
            );
            assert!(parse_announcements(&raw, PAGE).is_err(), "accepted {date}");
        }

        let raw = r#"{"announcements": [{"title": "  ", "url": "https://x.gov/1", "date": "2025-12-01"}]}"#;
        assert!(parse_announcements(raw, PAGE).is_err());
    }

    #[test]
    fn test_parse_ignores_extra_fields() {
        let raw = r#"{"announcements": [
            {"title": "T", "url": "https://x.gov/1", "date": "2025-12-01", "category": "spaq"}
        ], "note": "ok"}"#;
        assert_eq!(parse_announcements(raw, PAGE).unwrap().len(), 1);
    }

    #[test]
    fn test_prompt_includes_cutoff_and_base() {
        let prompt = ExtractionPrompt::new("food safety announcement", PAGE)
            .with_cutoff(NaiveDate::from_ymd_opt(2025, 11, 26))
            .render();

        assert!(prompt.contains("\"announcements\""));
        assert!(prompt.contains("on or after 2025-11-26"));
        assert!(prompt.contains(PAGE));
        assert!(prompt.contains("YYYY-MM-DD"));
        assert!(prompt.contains("4. Dates"));
    }

    #[test]
    fn test_prompt_without_cutoff() {
        let prompt = ExtractionPrompt::new("announcement", PAGE).render();
        assert!(!prompt.contains("on or after"));
        assert!(prompt.contains("3. Dates"));
    }

    #[test]
    fn test_prepare_content_bounds_length() {
        let raw = "公".repeat(20);
        assert_eq!(prepare_content(&raw, 5).chars().count(), 5);
        assert_eq!(prepare_content("short", 100), "short");
    }

    #[test]
    fn test_user_message_wraps_content() {
        let msg = user_message("<ul></ul>");
        assert!(msg.ends_with("\n\n<ul></ul>"));
    }
}
