//! In-memory implementation of the document index provider.
//!
//! Mirrors the response shapes of an OpenSearch/Elasticsearch index API so
//! the event indexer can be exercised without a live backend.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::IndexError;
use crate::interfaces::DocumentIndexProvider;
use crate::types::{IndexRequest, IndexResponse, OpType};

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    source: Value,
}

/// Thread-safe in-memory search backend.
///
/// Documents are keyed by `(index, id)`. A create-only request for an
/// existing id completes with a 409 conflict body, like the real backend.
#[derive(Debug, Default)]
pub struct InMemoryIndexProvider {
    documents: RwLock<HashMap<(String, String), StoredDocument>>,
    unavailable: RwLock<Option<String>>,
    requests: AtomicUsize,
}

impl InMemoryIndexProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent request fail at the transport level.
    pub async fn fail_with(&self, reason: impl Into<String>) {
        *self.unavailable.write().await = Some(reason.into());
    }

    /// Stop failing requests.
    pub async fn recover(&self) {
        *self.unavailable.write().await = None;
    }

    /// The stored source of a document.
    pub async fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.documents
            .read()
            .await
            .get(&(index.to_string(), id.to_string()))
            .map(|doc| doc.source.clone())
    }

    /// Number of stored documents across all indices.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether no documents are stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Number of index requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn conflict(request: &IndexRequest, current_version: u64) -> IndexResponse {
        IndexResponse::new(
            409,
            json!({
                "error": {
                    "type": "version_conflict_engine_exception",
                    "reason": format!(
                        "[{}]: version conflict, document already exists (current version [{}])",
                        request.id, current_version
                    ),
                    "index": request.index,
                },
                "status": 409
            }),
        )
    }

    fn acknowledged(request: &IndexRequest, version: u64, created: bool) -> IndexResponse {
        IndexResponse::new(
            if created { 201 } else { 200 },
            json!({
                "_index": request.index,
                "_type": request.document_type,
                "_id": request.id,
                "_version": version,
                "result": if created { "created" } else { "updated" },
                "_shards": {"total": 1, "successful": 1, "failed": 0}
            }),
        )
    }
}

#[async_trait]
impl DocumentIndexProvider for InMemoryIndexProvider {
    async fn index_document(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.unavailable.read().await.as_ref() {
            return Err(IndexError::transport(reason.clone()));
        }

        let key = (request.index.clone(), request.id.clone());
        let mut documents = self.documents.write().await;

        let response = match documents.entry(key) {
            Entry::Occupied(mut entry) => match request.op_type {
                OpType::Create => Self::conflict(request, entry.get().version),
                OpType::Index => {
                    let existing = entry.get_mut();
                    existing.version += 1;
                    existing.source = request.body.clone();
                    Self::acknowledged(request, existing.version, false)
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(StoredDocument {
                    version: 1,
                    source: request.body.clone(),
                });
                Self::acknowledged(request, 1, true)
            }
        };

        debug!(
            index = %request.index,
            id = %request.id,
            status = response.http_status(),
            "In-memory index request"
        );
        Ok(response)
    }
}
