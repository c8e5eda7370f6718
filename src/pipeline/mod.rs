//! Pipeline entry points for watcher operations.
//!
//! - `run_watch`: Fetch, extract, diff, notify, and persist once
//! - `run_reminder`: Post a fixed reminder to the webhook

pub mod diff;
pub mod remind;
pub mod run;
pub mod watch;

pub use diff::{DiffResult, calculate_diff, compute_new, dedup_by_url, merge};
pub use remind::{ReminderOutcome, run_reminder};
pub use run::{NotifyStatus, Orchestrator, RunPhase, RunReport};
pub use watch::{WatchOptions, run_watch};
