// src/services/mod.rs

//! External collaborators of a watch run.
//!
//! Each one sits behind a trait so runs can be exercised with fakes.

pub mod extract;
pub mod fetch;
pub mod notify;
pub mod openai;
pub mod summary;

pub use extract::{ExtractionPrompt, Extractor};
pub use fetch::{HttpFetcher, PageFetcher};
pub use notify::{Notifier, WebhookNotifier, WebhookPayload};
pub use openai::OpenAiExtractor;
