//! Change detection between a fresh extraction and stored history.
//!
//! Records are keyed by URL. A record is new when its URL appears nowhere in
//! history; the merged history lists new records first, then the older ones,
//! with at most one record per URL.

use std::collections::HashSet;

use crate::models::Record;

/// Outcome of comparing an extraction against history.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    /// Records whose URL is absent from history, in extraction order
    pub new_records: Vec<Record>,
    /// Number of records in the extraction
    pub extracted_count: usize,
    /// Number of records in history
    pub history_count: usize,
}

impl DiffResult {
    /// Check if anything new was found.
    pub fn has_changes(&self) -> bool {
        !self.new_records.is_empty()
    }

    /// Number of new records.
    pub fn new_count(&self) -> usize {
        self.new_records.len()
    }
}

/// Compare a fresh extraction with history.
pub fn calculate_diff(extracted: &[Record], history: &[Record]) -> DiffResult {
    DiffResult {
        new_records: compute_new(extracted, history),
        extracted_count: extracted.len(),
        history_count: history.len(),
    }
}

/// Every record of `extracted` whose URL does not occur in `history`,
/// keeping the order of `extracted`.
pub fn compute_new(extracted: &[Record], history: &[Record]) -> Vec<Record> {
    let known: HashSet<&str> = history.iter().map(Record::url).collect();

    extracted
        .iter()
        .filter(|r| !known.contains(r.url()))
        .cloned()
        .collect()
}

/// Deduplicated union of `new_items` and `history`.
///
/// Walks `new_items` then `history`, keeping the first record seen for each
/// URL. New items therefore win over history, and come first.
pub fn merge(new_items: &[Record], history: &[Record]) -> Vec<Record> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(new_items.len() + history.len());
    let mut merged = Vec::with_capacity(new_items.len() + history.len());

    for record in new_items.iter().chain(history) {
        if seen.insert(record.url()) {
            merged.push(record.clone());
        }
    }

    merged
}

/// Collapse repeated URLs in a single sequence; first occurrence wins.
pub fn dedup_by_url(records: &[Record]) -> Vec<Record> {
    merge(records, &[])
}
