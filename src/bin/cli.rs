//! Notice watcher CLI
//!
//! Runs once per invocation; schedule it with cron or a systemd timer.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use notice_watcher::{
    error::Result,
    models::Config,
    pipeline::{self, NotifyStatus, ReminderOutcome, WatchOptions},
    storage::{HistoryStore, LocalHistoryStore},
};

/// Watches an announcement listing page and reports new notices
#[derive(Parser, Debug)]
#[command(name = "notice-watcher", version, about = "Announcement change watcher")]
struct Cli {
    /// Path to storage directory containing config.toml and history
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the listing, detect new announcements, notify, and save history
    Run {
        /// Do not send a webhook notification
        #[arg(long)]
        no_notify: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show stored announcement history
    History {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Post the reminder message to the webhook
    Remind {
        /// Message to send instead of the configured one
        #[arg(long)]
        text: Option<String>,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_webhook_override(std::env::var("WEBHOOK_URL").ok());

    log::debug!("Loaded configuration from {}", config_path.display());

    match cli.command.unwrap_or(Command::Run { no_notify: false }) {
        Command::Run { no_notify } => {
            config.validate()?;
            log::info!("Notice watcher starting...");

            let options = WatchOptions { notify: !no_notify };
            let report = pipeline::run_watch(Arc::new(config), &cli.storage_dir, options).await?;

            log::info!(
                "Run complete: {} extracted, {} new, {} in history",
                report.extracted,
                report.new_records.len(),
                report.history_len
            );
            if let NotifyStatus::Failed(reason) = &report.notification {
                log::warn!("New announcements were saved but not delivered: {}", reason);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            log::info!("  Target: {}", config.source.target_url);
            log::info!("  History: {}", config.history_path(&cli.storage_dir).display());
            log::info!(
                "  Webhook: {}",
                if config.notify.webhook_url.is_some() {
                    "configured"
                } else {
                    "not configured"
                }
            );
        }

        Command::History { limit } => {
            let store = LocalHistoryStore::new(config.history_path(&cli.storage_dir));
            let records = store.load().await;

            log::info!("{} announcements in {}", records.len(), store.location());
            for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{}", record.format("{date}  {title}\n            {url}"));
            }
        }

        Command::Remind { text } => {
            let outcome = pipeline::run_reminder(&config.notify, text.as_deref()).await;
            if let ReminderOutcome::Failed(reason) = outcome {
                log::warn!("Reminder not delivered: {}", reason);
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
