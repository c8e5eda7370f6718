//! In-memory history storage.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;
use crate::storage::HistoryStore;

/// History held in process memory. Counts saves so callers can tell whether
/// a run reached persistence.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<Record>>,
    saves: Mutex<usize>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`.
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            saves: Mutex::new(0),
        }
    }

    /// Current contents.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of completed `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|s| *s).unwrap_or_default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn load(&self) -> Vec<Record> {
        self.records()
    }

    async fn save(&self, records: &[Record]) -> Result<()> {
        if let Ok(mut stored) = self.records.lock() {
            *stored = records.to_vec();
        }
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
