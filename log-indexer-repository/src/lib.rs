//! # Log Indexer Repository
//!
//! This crate provides the narrow backend capability the log indexer needs:
//! storing one document under an index/type/id. It includes the error
//! types, the `DocumentIndexProvider` interface, a concrete implementation
//! for OpenSearch and an in-memory implementation.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod opensearch;
pub mod types;

pub use config::ClientConfig;
pub use errors::IndexError;
pub use interfaces::DocumentIndexProvider;
pub use memory::InMemoryIndexProvider;
pub use opensearch::OpenSearchClient;
pub use types::{IndexRequest, IndexResponse, OpType};
