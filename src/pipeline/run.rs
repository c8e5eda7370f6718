// src/pipeline/run.rs

//! One watch run: fetch → extract → diff → notify → persist.
//!
//! Fetch and extraction failures end the run. A failed notification is
//! logged and the run still persists history.

use std::fmt;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Config, Record};
use crate::pipeline::diff::{calculate_diff, dedup_by_url, merge};
use crate::services::extract::prepare_content;
use crate::services::{ExtractionPrompt, Extractor, Notifier, PageFetcher};
use crate::storage::HistoryStore;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Fetching,
    Extracting,
    Diffing,
    Notifying,
    Persisting,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Fetching => "fetch",
            RunPhase::Extracting => "extract",
            RunPhase::Diffing => "diff",
            RunPhase::Notifying => "notify",
            RunPhase::Persisting => "persist",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What happened in the notify phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyStatus {
    /// No new records, nothing sent
    NothingNew,
    /// New records, but no sink configured
    Unconfigured,
    Sent,
    /// Sink rejected the message; the run carried on
    Failed(String),
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Records returned by the extractor, after collapsing repeated URLs
    pub extracted: usize,
    /// Records not seen before this run
    pub new_records: Vec<Record>,
    pub notification: NotifyStatus,
    /// History size after persisting
    pub history_len: usize,
}

/// Sequences a single watch run over its collaborators.
pub struct Orchestrator {
    config: Arc<Config>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn HistoryStore>,
    notifier: Option<Arc<dyn Notifier>>,
    phase: RunPhase,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            fetcher,
            extractor,
            store,
            notifier: None,
            phase: RunPhase::Fetching,
        }
    }

    /// Attach a notification sink. Without one, new records are only logged.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Phase reached by the last run.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        log::debug!("Run phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn fail(&mut self, error: AppError) -> AppError {
        log::error!("Run failed during {} phase: {}", self.phase, error);
        self.phase = RunPhase::Failed;
        error
    }

    /// Execute the run.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.phase = RunPhase::Fetching;

        let history = self.store.load().await;
        log::info!(
            "Loaded {} known announcements from {}",
            history.len(),
            self.store.location()
        );

        // Fetching
        let target = self.config.source.target_url.clone();
        log::info!("Fetching {}", target);
        let fetched = self.fetcher.fetch(&target).await;
        let raw = match fetched {
            Ok(raw) => raw,
            Err(e) => return Err(self.fail(e)),
        };
        log::info!("Listing page fetched ({} bytes)", raw.len());

        // Extracting
        self.enter(RunPhase::Extracting);
        let content = prepare_content(&raw, self.config.source.max_content_chars);
        let instructions = ExtractionPrompt::from_config(&self.config).render();
        let result = self.extractor.extract(content, &instructions).await;
        let extracted = match result {
            Ok(records) => records,
            Err(e) => return Err(self.fail(e)),
        };
        let extracted = {
            let deduped = dedup_by_url(&extracted);
            if deduped.len() < extracted.len() {
                log::debug!(
                    "Dropped {} repeated links from extraction",
                    extracted.len() - deduped.len()
                );
            }
            deduped
        };
        log::info!("Extracted {} announcements", extracted.len());

        // Diffing
        self.enter(RunPhase::Diffing);
        let diff = calculate_diff(&extracted, &history);
        log::info!("Found {} new announcements", diff.new_count());
        for record in &diff.new_records {
            log::info!("  {}", record.format("[{date}] {title} - {url}"));
        }

        // Notifying
        self.enter(RunPhase::Notifying);
        let notification = self.notify(&diff.new_records).await;

        // Persisting
        self.enter(RunPhase::Persisting);
        let merged = merge(&diff.new_records, &history);
        if let Err(e) = self.store.save(&merged).await {
            log::error!("Could not save history to {}: {}", self.store.location(), e);
            return Err(e);
        }
        log::info!(
            "History saved: {} announcements in {}",
            merged.len(),
            self.store.location()
        );

        self.enter(RunPhase::Done);
        Ok(RunReport {
            extracted: extracted.len(),
            new_records: diff.new_records,
            notification,
            history_len: merged.len(),
        })
    }

    async fn notify(&self, new_records: &[Record]) -> NotifyStatus {
        if new_records.is_empty() {
            return NotifyStatus::NothingNew;
        }
        let Some(notifier) = &self.notifier else {
            log::info!("No webhook configured, skipping notification");
            return NotifyStatus::Unconfigured;
        };

        log::info!("Sending notification for {} announcements", new_records.len());
        match notifier.notify(new_records).await {
            Ok(()) => {
                log::info!("Notification sent");
                NotifyStatus::Sent
            }
            Err(e) => {
                log::error!("Notification failed: {}", e);
                NotifyStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::storage::{LocalHistoryStore, MemoryHistoryStore};

    struct StaticFetcher {
        body: std::result::Result<String, String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.body.clone().map_err(|m| AppError::fetch(url, m))
        }
    }

    #[derive(Default)]
    struct FakeExtractor {
        records: Vec<Record>,
        fail: bool,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FakeExtractor {
        fn returning(records: Vec<Record>) -> Self {
            Self {
                records,
                ..Self::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Extractor for FakeExtractor {
        async fn extract(&self, text: &str, instructions: &str) -> Result<Vec<Record>> {
            self.seen
                .lock()
                .unwrap()
                .push((text.to_string(), instructions.to_string()));
            if self.fail {
                return Err(AppError::extract("model output was not JSON"));
            }
            Ok(self.records.clone())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fail: bool,
        calls: Mutex<Vec<Vec<Record>>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, records: &[Record]) -> Result<()> {
            self.calls.lock().unwrap().push(records.to_vec());
            if self.fail {
                return Err(AppError::notify("webhook returned status 500"));
            }
            Ok(())
        }
    }

    fn record(url: &str, title: &str) -> Record {
        Record::new(title, url, "2025-12-01")
    }

    fn urls(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.url().to_string()).collect()
    }

    fn ok_fetcher() -> Arc<StaticFetcher> {
        Arc::new(StaticFetcher {
            body: Ok("<ul><li>listing</li></ul>".to_string()),
        })
    }

    fn orchestrator(
        config: Config,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn HistoryStore>,
    ) -> Orchestrator {
        Orchestrator::new(Arc::new(config), fetcher, extractor, store)
    }

    #[tokio::test]
    async fn test_first_run_everything_new() {
        let store = Arc::new(MemoryHistoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let extractor = Arc::new(FakeExtractor::returning(vec![
            record("a", "A"),
            record("b", "B"),
        ]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone())
            .with_notifier(notifier.clone());
        let report = run.run().await.unwrap();

        assert_eq!(run.phase(), RunPhase::Done);
        assert_eq!(urls(&report.new_records), vec!["a", "b"]);
        assert_eq!(report.notification, NotifyStatus::Sent);
        assert_eq!(urls(&store.records()), vec!["a", "b"]);
        assert_eq!(notifier.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_known_url_keeps_old_version() {
        let store = Arc::new(MemoryHistoryStore::with_records(vec![record("a", "old")]));
        let extractor = Arc::new(FakeExtractor::returning(vec![
            record("a", "new"),
            record("c", "C"),
        ]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone());
        let report = run.run().await.unwrap();

        assert_eq!(urls(&report.new_records), vec!["c"]);
        let history = store.records();
        assert_eq!(urls(&history), vec!["c", "a"]);
        assert_eq!(history[1].title(), "old");
        assert_eq!(report.history_len, 2);
    }

    #[tokio::test]
    async fn test_nothing_new_skips_notifier_but_persists() {
        let store = Arc::new(MemoryHistoryStore::with_records(vec![
            record("a", "A"),
            record("b", "B"),
        ]));
        let notifier = Arc::new(RecordingNotifier::default());
        let extractor = Arc::new(FakeExtractor::returning(vec![record("b", "B")]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone())
            .with_notifier(notifier.clone());
        let report = run.run().await.unwrap();

        assert_eq!(report.notification, NotifyStatus::NothingNew);
        assert!(notifier.calls.lock().unwrap().is_empty());
        assert_eq!(store.save_count(), 1);
        assert_eq!(urls(&store.records()), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_notifier_failure_still_persists() {
        let store = Arc::new(MemoryHistoryStore::new());
        let notifier = Arc::new(RecordingNotifier {
            fail: true,
            ..RecordingNotifier::default()
        });
        let extractor = Arc::new(FakeExtractor::returning(vec![record("a", "A")]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone())
            .with_notifier(notifier);
        let report = run.run().await.unwrap();

        assert!(matches!(report.notification, NotifyStatus::Failed(ref m) if m.contains("500")));
        assert_eq!(run.phase(), RunPhase::Done);
        assert_eq!(urls(&store.records()), vec!["a"]);
    }

    #[tokio::test]
    async fn test_unconfigured_notifier_is_skipped() {
        let store = Arc::new(MemoryHistoryStore::new());
        let extractor = Arc::new(FakeExtractor::returning(vec![record("a", "A")]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone());
        let report = run.run().await.unwrap();

        assert_eq!(report.notification, NotifyStatus::Unconfigured);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_and_writes_nothing() {
        let store = Arc::new(MemoryHistoryStore::with_records(vec![record("a", "A")]));
        let extractor = Arc::new(FakeExtractor::returning(vec![record("b", "B")]));
        let fetcher = Arc::new(StaticFetcher {
            body: Err("connection refused".to_string()),
        });

        let mut run = orchestrator(Config::default(), fetcher, extractor.clone(), store.clone());
        let err = run.run().await.unwrap_err();

        assert!(matches!(err, AppError::Fetch { .. }));
        assert_eq!(run.phase(), RunPhase::Failed);
        assert!(extractor.seen.lock().unwrap().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal_and_writes_nothing() {
        let store = Arc::new(MemoryHistoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut run = orchestrator(
            Config::default(),
            ok_fetcher(),
            Arc::new(FakeExtractor::failing()),
            store.clone(),
        )
        .with_notifier(notifier.clone());
        let err = run.run().await.unwrap_err();

        assert!(matches!(err, AppError::Extract(_)));
        assert_eq!(run.phase(), RunPhase::Failed);
        assert!(notifier.calls.lock().unwrap().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_links_in_extraction_notify_once() {
        let store = Arc::new(MemoryHistoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let extractor = Arc::new(FakeExtractor::returning(vec![
            record("a", "A"),
            record("a", "A (pinned)"),
            record("b", "B"),
        ]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone())
            .with_notifier(notifier.clone());
        let report = run.run().await.unwrap();

        assert_eq!(report.extracted, 2);
        assert_eq!(urls(&notifier.calls.lock().unwrap()[0]), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_extractor_gets_bounded_content_and_prompt() {
        let mut config = Config::default();
        config.source.max_content_chars = 10;
        config.extractor.cutoff_date = chrono::NaiveDate::from_ymd_opt(2025, 11, 26);

        let extractor = Arc::new(FakeExtractor::returning(Vec::new()));
        let mut run = orchestrator(
            config,
            ok_fetcher(),
            extractor.clone(),
            Arc::new(MemoryHistoryStore::new()),
        );
        run.run().await.unwrap();

        let seen = extractor.seen.lock().unwrap();
        assert_eq!(seen[0].0, "<ul><li>li");
        assert!(seen[0].1.contains("2025-11-26"));
    }

    #[tokio::test]
    async fn test_second_run_with_same_listing_finds_nothing() {
        let store = Arc::new(MemoryHistoryStore::new());
        let extractor = Arc::new(FakeExtractor::returning(vec![
            record("a", "A"),
            record("b", "B"),
        ]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone());
        run.run().await.unwrap();
        let report = run.run().await.unwrap();

        assert!(report.new_records.is_empty());
        assert_eq!(report.history_len, 2);
        assert_eq!(store.save_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_history_entry_is_not_lost() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(
            &path,
            r#"[
  {"title": "A", "url": "https://x.gov/a", "date": "2025-11-27"},
  {"title": "B", "url": "https://x.gov/b", "date": null}
]"#,
        )
        .unwrap();

        let store = Arc::new(LocalHistoryStore::new(&path));
        let extractor = Arc::new(FakeExtractor::returning(vec![
            record("https://x.gov/a", "A"),
            record("https://x.gov/c", "C"),
        ]));

        let mut run = orchestrator(Config::default(), ok_fetcher(), extractor, store.clone());
        let report = run.run().await.unwrap();

        assert_eq!(urls(&report.new_records), vec!["https://x.gov/c"]);
        assert_eq!(
            urls(&store.load().await),
            vec!["https://x.gov/c", "https://x.gov/a", "https://x.gov/b"]
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RunPhase::Extracting.to_string(), "extract");
        assert_eq!(RunPhase::Failed.to_string(), "failed");
    }
}
