//! Announcement record.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// One announcement from the listing page.
///
/// Identity is the URL alone: two records pointing at the same URL are the
/// same announcement even if their title or date differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    title: String,
    url: String,
    /// Publication date, `YYYY-MM-DD`
    date: String,
}

impl Record {
    pub fn new(title: impl Into<String>, url: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            date: date.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Format record for display using a template.
    ///
    /// Supported placeholders: `{title}`, `{url}`, `{date}`. The template is
    /// scanned once, so braces inside field values are copied verbatim.
    pub fn format(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + self.title.len() + self.url.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let field = [
                ("{title}", &self.title),
                ("{url}", &self.url),
                ("{date}", &self.date),
            ]
            .into_iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder));

            match field {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}
