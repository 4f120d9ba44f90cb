//! OpenSearch implementation of the document index provider.
//!
//! This module provides a concrete implementation of `DocumentIndexProvider`
//! using OpenSearch as the backend.

mod client;

pub use client::OpenSearchClient;
