//! Local filesystem history storage.
//!
//! Writes are atomic: the JSON is written to a sibling temp file and then
//! renamed over the history file, so a crash mid-write leaves the previous
//! history intact.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Record;
use crate::storage::HistoryStore;

/// History kept as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    path: PathBuf,
}

impl LocalHistoryStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the history file, returning None if it doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read used by `load`; absent file is `Ok(None)`.
    ///
    /// The file must hold a JSON array, but entries are taken one at a time:
    /// a bad entry is skipped instead of discarding the whole history.
    async fn read_records(&self) -> Result<Option<Vec<Record>>> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(None);
        };
        let entries: Vec<Value> = serde_json::from_slice(&bytes)?;

        let records = entries
            .iter()
            .enumerate()
            .filter_map(|(i, entry)| {
                let record = record_from_entry(entry);
                if record.is_none() {
                    log::warn!(
                        "Skipping history entry {} in {}: no url",
                        i,
                        self.path.display()
                    );
                }
                record
            })
            .collect();
        Ok(Some(records))
    }
}

/// Lenient entry decoding: `url` is required, other fields default to empty.
fn record_from_entry(entry: &Value) -> Option<Record> {
    let url = entry.get("url")?.as_str()?;
    Some(Record::new(
        str_field(entry, "title"),
        url,
        str_field(entry, "date"),
    ))
}

fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl HistoryStore for LocalHistoryStore {
    async fn load(&self) -> Vec<Record> {
        match self.read_records().await {
            Ok(Some(records)) => {
                log::debug!(
                    "Loaded {} history records from {}",
                    records.len(),
                    self.path.display()
                );
                records
            }
            Ok(None) => {
                log::warn!(
                    "No history found at {}, starting fresh",
                    self.path.display()
                );
                Vec::new()
            }
            Err(e) => {
                log::warn!(
                    "Could not read history from {}: {}. Starting fresh",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, records: &[Record]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)?;
        self.write_bytes(&bytes).await?;
        log::debug!(
            "Wrote {} history records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
