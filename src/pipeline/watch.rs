// src/pipeline/watch.rs

//! Watch pipeline wired to the real collaborators.

use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::run::{Orchestrator, RunReport};
use crate::services::{HttpFetcher, OpenAiExtractor, WebhookNotifier};
use crate::storage::LocalHistoryStore;

/// Options for a single watch run.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Send a webhook notification for new announcements
    pub notify: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { notify: true }
    }
}

/// Run the watcher once against the configured listing page.
pub async fn run_watch(
    config: Arc<Config>,
    storage_dir: &Path,
    options: WatchOptions,
) -> Result<RunReport> {
    let store = LocalHistoryStore::new(config.history_path(storage_dir));
    let fetcher = HttpFetcher::new(&config.source)?;
    let extractor = OpenAiExtractor::from_config(&config)?;
    log::info!("Using model {} for extraction", extractor.model());

    let mut orchestrator = Orchestrator::new(
        Arc::clone(&config),
        Arc::new(fetcher),
        Arc::new(extractor),
        Arc::new(store),
    );

    if options.notify {
        if let Some(notifier) = WebhookNotifier::from_config(&config.notify)? {
            orchestrator = orchestrator.with_notifier(Arc::new(notifier));
        }
    } else {
        log::info!("Notifications disabled for this run");
    }

    orchestrator.run().await
}
