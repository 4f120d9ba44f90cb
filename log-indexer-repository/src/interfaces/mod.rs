//! Interface definitions for the search backend.
//!
//! This module defines the abstract `DocumentIndexProvider` trait that allows
//! for dependency injection and swappable backend implementations.

mod document_index_provider;

pub use document_index_provider::DocumentIndexProvider;
