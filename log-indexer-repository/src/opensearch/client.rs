//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `DocumentIndexProvider`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    params, IndexParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::config::ClientConfig;
use crate::errors::IndexError;
use crate::interfaces::DocumentIndexProvider;
use crate::types::{IndexRequest, IndexResponse, OpType};

/// OpenSearch client implementation.
///
/// OpenSearch indices are typeless, so the request's `document_type` is only
/// recorded in diagnostics and never sent on the wire.
///
/// # Example
///
/// ```ignore
/// use log_indexer_repository::{ClientConfig, IndexRequest, OpenSearchClient};
/// let client = OpenSearchClient::new(&ClientConfig::new("http://localhost:9200"))?;
///
/// let request = IndexRequest::create("log", "event", "abc", json!({"id": "abc"}));
/// let response = client.index_document(&request).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the configured URL.
    ///
    /// No request is sent; an unreachable server surfaces on the first call.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(IndexError)` - If the URL is invalid or the transport can't be built
    pub fn new(config: &ClientConfig) -> Result<Self, IndexError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| IndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool);
        if config.disable_proxy {
            builder = builder.disable_proxy();
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let transport = builder
            .build()
            .map_err(|e| IndexError::connection(e.to_string()))?;

        info!(
            url = %config.url,
            timeout_ms = config.timeout.map(|t| t.as_millis() as u64),
            "Created OpenSearch client"
        );

        Ok(Self {
            client: OpenSearch::new(transport),
        })
    }

    /// Check if the cluster is reachable and not in `red` state.
    pub async fn health_check(&self) -> Result<bool, IndexError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| IndexError::transport(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| IndexError::parse(e.to_string()))?;

        let status = body.get("status").and_then(Value::as_str).unwrap_or("red");
        debug!(status = %status, "Cluster health");
        Ok(status != "red")
    }

    /// Parse a response body. Error responses that are not JSON, such as a
    /// proxy's HTML page, are kept as a string.
    fn parse_body(status: u16, text: String) -> Result<Value, IndexError> {
        match serde_json::from_str(&text) {
            Ok(body) => Ok(body),
            Err(_) if !(200..=299).contains(&status) => Ok(Value::String(text)),
            Err(e) => Err(IndexError::parse(format!("status {}: {}", status, e))),
        }
    }

    fn wire_op_type(op_type: OpType) -> params::OpType {
        match op_type {
            OpType::Index => params::OpType::Index,
            OpType::Create => params::OpType::Create,
        }
    }
}

#[async_trait]
impl DocumentIndexProvider for OpenSearchClient {
    /// Index one document with the request's operation type.
    ///
    /// Any completed HTTP response is returned as `Ok`, including error
    /// responses such as a 409 conflict; the caller classifies it.
    #[instrument(skip(self, request), fields(index = %request.index, id = %request.id, op_type = %request.op_type))]
    async fn index_document(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(&request.index, &request.id))
            .op_type(Self::wire_op_type(request.op_type))
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Index request failed");
                IndexError::transport(e.to_string())
            })?;

        let status = response.status_code().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IndexError::parse(format!("status {}: {}", status, e)))?;
        let body = Self::parse_body(status, text)?;

        debug!(
            status = status,
            document_type = %request.document_type,
            "Index request completed"
        );
        Ok(IndexResponse::new(status, body))
    }
}
