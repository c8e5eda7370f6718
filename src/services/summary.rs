//! Human-readable summaries of new announcements.

use crate::models::Record;

/// Markdown summary: a heading with the count, then one linked line per record.
pub fn markdown(heading: &str, records: &[Record]) -> String {
    let lines: Vec<String> = records
        .iter()
        .map(|r| r.format("- [{date}] [{title}]({url})"))
        .collect();

    format!(
        "### 🚨 {heading}: {} new announcement{}\n\n{}",
        records.len(),
        plural(records.len()),
        lines.join("\n")
    )
}

/// Plain-text fallback for sinks that do not render markdown.
pub fn plain(records: &[Record]) -> String {
    let lines: Vec<String> = records
        .iter()
        .map(|r| r.format("{date}: {title} - {url}"))
        .collect();

    format!(
        "Found {} new announcement{}:\n{}",
        records.len(),
        plural(records.len()),
        lines.join("\n")
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
