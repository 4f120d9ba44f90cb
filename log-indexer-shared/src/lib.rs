//! # Log Indexer Shared
//!
//! Types shared between the log indexer crates.

mod event;

pub use event::{now_rfc3339, EventError, LogEvent};
