//! Document index provider trait definition.
//!
//! This module defines the abstract interface for the single backend
//! operation the log indexer performs, allowing for different backend
//! implementations (OpenSearch, Elasticsearch, in-memory, etc.).

use async_trait::async_trait;

use crate::errors::IndexError;
use crate::types::{IndexRequest, IndexResponse};

/// Abstracts the underlying search backend.
///
/// Implementations are injected into the event indexer so it can be tested
/// without a live backend.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait DocumentIndexProvider: Send + Sync {
    /// Store a single document.
    ///
    /// # Arguments
    ///
    /// * `request` - Index, type, id, body and operation type of the document
    ///
    /// # Returns
    ///
    /// * `Ok(IndexResponse)` - The request completed. The body may still carry
    ///   a logical error, e.g. a conflict under `OpType::Create`.
    /// * `Err(IndexError)` - The request failed at the transport or protocol level
    async fn index_document(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError>;
}
