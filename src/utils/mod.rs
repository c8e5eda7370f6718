//! Utility functions and helpers.

pub mod http;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Resolve a URL string against a base URL string.
pub fn resolve(base_url: &str, href: &str) -> Option<String> {
    Url::parse(base_url)
        .ok()
        .map(|base| resolve_url(&base, href))
}

/// Cut `text` to at most `max_chars` user-perceived characters.
///
/// Never splits a grapheme cluster, so multi-byte CJK text and emoji stay
/// valid UTF-8.
pub fn truncate_graphemes(text: &str, max_chars: usize) -> &str {
    match text.grapheme_indices(true).nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
