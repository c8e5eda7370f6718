// src/pipeline/remind.rs

//! Fixed reminder message to the notification webhook.

use crate::models::NotifyConfig;
use crate::services::{WebhookNotifier, WebhookPayload};

/// Result of a reminder attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOutcome {
    Sent,
    /// No webhook configured
    Skipped,
    Failed(String),
}

/// Post `text` (or the configured reminder) to the webhook.
///
/// Best effort: failures are logged and reported, never raised.
pub async fn run_reminder(config: &NotifyConfig, text: Option<&str>) -> ReminderOutcome {
    let notifier = match WebhookNotifier::from_config(config) {
        Ok(Some(notifier)) => notifier,
        Ok(None) => {
            log::info!("No webhook configured, skipping reminder");
            return ReminderOutcome::Skipped;
        }
        Err(e) => {
            log::error!("Could not set up webhook: {}", e);
            return ReminderOutcome::Failed(e.to_string());
        }
    };

    let message = text.unwrap_or(&config.reminder_text);
    log::info!("Sending reminder");
    match notifier.post(&WebhookPayload::message(message)).await {
        Ok(()) => {
            log::info!("Reminder sent");
            ReminderOutcome::Sent
        }
        Err(e) => {
            log::error!("Reminder failed: {}", e);
            ReminderOutcome::Failed(e.to_string())
        }
    }
}
