//! Storage abstractions for announcement history.
//!
//! History is the durable list of every announcement seen so far, newest
//! first. It is read once when a run starts and written once when it ends.
//!
//! ## Storage Layout
//!
//! ```text
//! storage/
//! ├── config.toml           # Watcher configuration
//! └── data.json             # History: JSON array of {title, url, date}
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

// Re-export for convenience
pub use local::LocalHistoryStore;
pub use memory::MemoryHistoryStore;

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Load every known record.
    ///
    /// Never fails: a missing or unreadable history is logged and treated as
    /// empty so the run can continue.
    async fn load(&self) -> Vec<Record>;

    /// Replace the stored history with `records`.
    async fn save(&self, records: &[Record]) -> Result<()>;

    /// Where the history lives, for log output.
    fn location(&self) -> String;
}
