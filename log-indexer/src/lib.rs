//! # Log Indexer
//!
//! Forwards structured log events to a search index, one create-only
//! document request per event, and reports each request's outcome.
//!
//! ## Flow
//!
//! 1. **Config**: `IndexerConfig` names the backend client, index and type
//! 2. **Indexer**: `EventIndexer::index_event` submits one request per event
//! 3. **Outcome**: each request resolves to exactly one `IndexOutcome`,
//!    delivered through the returned task handle and to every subscriber
//! 4. **Adapters**: `as_listener` and `as_logging_adapter` plug the indexer
//!    into callback-style logging code

pub mod config;
pub mod indexer;
pub mod logger;
pub mod logging_service;
pub mod outcome;

pub use config::{ConfigError, Dependencies, IndexerConfig, IndexerOptions};
pub use indexer::{EventIndexer, EventListener};
pub use logger::IndexerLogger;
pub use logging_service::{
    InvalidEvent, InvalidEventHandler, LoggingService, LoggingServiceOptions, ValidationError,
};
pub use outcome::{IndexFailure, IndexOutcome};

use thiserror::Error;

/// Errors that can occur while wiring or running the indexer binary.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The indexer rejected its configuration.
    #[error("Invalid indexer configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Backend error.
    #[error("Index error: {0}")]
    IndexError(#[from] log_indexer_repository::IndexError),

    /// A background task failed.
    #[error("Task error: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexerError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
