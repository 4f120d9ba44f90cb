//! Configuration and dependency wiring for the log indexer.

mod dependencies;
mod indexer_config;

pub use dependencies::Dependencies;
pub use indexer_config::{
    ConfigError, IndexerConfig, IndexerOptions, DEFAULT_DOCUMENT_TYPE, DEFAULT_INDEX_NAME,
    DEFAULT_LOG_LEVEL, DEFAULT_NOTIFICATION_CAPACITY,
};
