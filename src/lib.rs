// src/lib.rs

//! Notice watcher library: detects new announcements on a listing page.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
