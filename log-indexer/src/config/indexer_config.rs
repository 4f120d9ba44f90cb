//! Indexer configuration, defaults and validation.

use std::env;
use std::fmt;
use std::sync::Arc;

use log_indexer_repository::DocumentIndexProvider;
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::Span;

/// Default index the events are stored in.
pub const DEFAULT_INDEX_NAME: &str = "log";

/// Default document type.
pub const DEFAULT_DOCUMENT_TYPE: &str = "event";

/// Default level for the indexer's own diagnostics.
pub const DEFAULT_LOG_LEVEL: &str = "WARN";

/// Default number of outcomes buffered per subscriber.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1024;

const MAX_INDEX_NAME_BYTES: usize = 255;
const INDEX_NAME_FORBIDDEN: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|', ',', '#', ':'];

/// Errors raised while validating an [`IndexerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No backend client was supplied.
    #[error("A backend client is required")]
    MissingClient,

    /// The index name is not a legal index name.
    #[error("Invalid index name {name:?}: {reason}")]
    InvalidIndexName { name: String, reason: &'static str },

    /// The document type is empty or malformed.
    #[error("Invalid document type: {0:?}")]
    InvalidDocumentType(String),

    /// The log level is not a known level name.
    #[error("Invalid log level: {0:?}")]
    InvalidLogLevel(String),

    /// The notification capacity must be at least one.
    #[error("Notification capacity must be greater than zero")]
    InvalidNotificationCapacity,

    /// The indexer was constructed outside of a Tokio runtime.
    #[error("EventIndexer must be created within a Tokio runtime")]
    NoRuntime,

    /// Options could not be parsed.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Caller-supplied settings merged over the documented defaults.
///
/// Every field is optional; `None` keeps the default. Field aliases accept
/// the `index`, `type` and `logLevel` spellings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexerOptions {
    /// Target index name.
    #[serde(alias = "index")]
    pub index_name: Option<String>,
    /// Target document type.
    #[serde(alias = "type")]
    pub document_type: Option<String>,
    /// Level for the indexer's own diagnostics.
    #[serde(alias = "logLevel")]
    pub log_level: Option<String>,
}

impl IndexerOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidOptions(e.to_string()))
    }

    /// Read options from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `LOG_INDEX`: index name
    /// - `LOG_DOCUMENT_TYPE`: document type
    /// - `LOG_LEVEL`: indexer log level
    pub fn from_env() -> Self {
        Self {
            index_name: env::var("LOG_INDEX").ok(),
            document_type: env::var("LOG_DOCUMENT_TYPE").ok(),
            log_level: env::var("LOG_LEVEL").ok(),
        }
    }
}

/// Configuration for an `EventIndexer`.
#[derive(Clone)]
pub struct IndexerConfig {
    /// The backend client. Required.
    pub client: Option<Arc<dyn DocumentIndexProvider>>,
    /// Target index name.
    pub index_name: String,
    /// Target document type.
    pub document_type: String,
    /// Level for the indexer's own diagnostics.
    pub log_level: String,
    /// Span the indexer's diagnostics are recorded under. A span named
    /// `event_indexer` is created when unset.
    pub span: Option<Span>,
    /// Outcomes buffered per subscriber before slow subscribers lag.
    pub notification_capacity: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            client: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            span: None,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl fmt::Debug for IndexerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexerConfig")
            .field("client", &self.client.as_ref().map(|_| "<provider>"))
            .field("index_name", &self.index_name)
            .field("document_type", &self.document_type)
            .field("log_level", &self.log_level)
            .field("notification_capacity", &self.notification_capacity)
            .finish()
    }
}

impl IndexerConfig {
    /// Create a config with the given client and default settings.
    pub fn new(client: Arc<dyn DocumentIndexProvider>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    /// Set the index name.
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    /// Set the document type.
    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = document_type.into();
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, log_level: impl Into<String>) -> Self {
        self.log_level = log_level.into();
        self
    }

    /// Record diagnostics under the given span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Set the per-subscriber notification buffer.
    pub fn with_notification_capacity(mut self, capacity: usize) -> Self {
        self.notification_capacity = capacity;
        self
    }

    /// Merge options over the current values. `None` fields are left as is.
    pub fn with_options(mut self, options: IndexerOptions) -> Self {
        if let Some(index_name) = options.index_name {
            self.index_name = index_name;
        }
        if let Some(document_type) = options.document_type {
            self.document_type = document_type;
        }
        if let Some(log_level) = options.log_level {
            self.log_level = log_level;
        }
        self
    }

    /// Validate the config.
    pub(crate) fn validate(self) -> Result<IndexerSettings, ConfigError> {
        let client = self.client.ok_or(ConfigError::MissingClient)?;
        validate_index_name(&self.index_name)?;
        validate_document_type(&self.document_type)?;
        let log_level = parse_log_level(&self.log_level)?;
        if self.notification_capacity == 0 {
            return Err(ConfigError::InvalidNotificationCapacity);
        }

        Ok(IndexerSettings {
            client,
            index_name: self.index_name,
            document_type: self.document_type,
            log_level,
            span: self.span,
            notification_capacity: self.notification_capacity,
        })
    }
}

/// A validated config.
pub(crate) struct IndexerSettings {
    pub client: Arc<dyn DocumentIndexProvider>,
    pub index_name: String,
    pub document_type: String,
    pub log_level: LevelFilter,
    pub span: Option<Span>,
    pub notification_capacity: usize,
}

fn validate_index_name(name: &str) -> Result<(), ConfigError> {
    let invalid = |reason| {
        Err(ConfigError::InvalidIndexName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("must not be empty");
    }
    if name == "." || name == ".." {
        return invalid("must not be `.` or `..`");
    }
    if name.len() > MAX_INDEX_NAME_BYTES {
        return invalid("must be at most 255 bytes");
    }
    if name.starts_with(['_', '-', '+']) {
        return invalid("must not start with `_`, `-` or `+`");
    }
    if name.chars().any(char::is_uppercase) {
        return invalid("must be lowercase");
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || INDEX_NAME_FORBIDDEN.contains(&c))
    {
        return invalid("contains a forbidden character");
    }
    Ok(())
}

fn validate_document_type(document_type: &str) -> Result<(), ConfigError> {
    if document_type.is_empty()
        || document_type.contains('/')
        || document_type.chars().any(char::is_whitespace)
    {
        return Err(ConfigError::InvalidDocumentType(document_type.to_string()));
    }
    Ok(())
}

fn parse_log_level(level: &str) -> Result<LevelFilter, ConfigError> {
    match level.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" => Ok(LevelFilter::WARN),
        "ERROR" => Ok(LevelFilter::ERROR),
        "OFF" => Ok(LevelFilter::OFF),
        _ => Err(ConfigError::InvalidLogLevel(level.to_string())),
    }
}
