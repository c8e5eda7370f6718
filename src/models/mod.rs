// src/models/mod.rs

//! Domain models for the watcher.

mod config;
mod record;

// Re-export all public types
pub use config::{Config, ExtractorConfig, NotifyConfig, SourceConfig, StorageConfig};
pub use record::Record;
