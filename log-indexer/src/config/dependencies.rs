//! Dependency initialization and wiring for the log indexer.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{IndexerConfig, IndexerOptions};
use crate::indexer::EventIndexer;
use crate::IndexerError;
use log_indexer_repository::{config::DEFAULT_URL, ClientConfig, OpenSearchClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured indexer ready to accept events.
    pub indexer: EventIndexer,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `OPENSEARCH_TIMEOUT_SECS`: per-request timeout in seconds (optional)
    /// - `LOG_INDEX`: index name (default: log)
    /// - `LOG_DOCUMENT_TYPE`: document type (default: event)
    /// - `LOG_LEVEL`: indexer log level (default: WARN)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexerError)` - If initialization fails
    pub async fn new() -> Result<Self, IndexerError> {
        let opensearch_url =
            env::var("OPENSEARCH_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let timeout = match env::var("OPENSEARCH_TIMEOUT_SECS") {
            Ok(secs) => Some(parse_timeout(&secs)?),
            Err(_) => None,
        };
        let options = IndexerOptions::from_env();

        info!(
            opensearch_url = %opensearch_url,
            timeout_secs = timeout.map(|t| t.as_secs()),
            index = options.index_name.as_deref().unwrap_or("(default)"),
            "Initializing dependencies"
        );

        let mut client_config = ClientConfig::new(opensearch_url);
        client_config.timeout = timeout;

        let search_client = connect(&client_config).await?;

        let indexer =
            EventIndexer::new(IndexerConfig::new(Arc::new(search_client)).with_options(options))?;

        Ok(Self { indexer })
    }
}

/// Create the OpenSearch client and verify the cluster is usable.
async fn connect(config: &ClientConfig) -> Result<OpenSearchClient, IndexerError> {
    let search_client = OpenSearchClient::new(config)?;

    if !search_client.health_check().await? {
        return Err(IndexerError::config("OpenSearch cluster is unhealthy"));
    }

    info!("OpenSearch connection verified");
    Ok(search_client)
}

fn parse_timeout(secs: &str) -> Result<Duration, IndexerError> {
    secs.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| IndexerError::config(format!("Invalid OPENSEARCH_TIMEOUT_SECS {:?}: {}", secs, e)))
}
