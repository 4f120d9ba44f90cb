//! Index error types.
//!
//! This module defines the error types that can occur while indexing a
//! document.

use thiserror::Error;

/// Errors that can occur during document index operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// Failed to set up the connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete at the transport or protocol level.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The backend completed the request but reported a logical error.
    #[error("Index rejected: {reason}")]
    Rejected {
        /// The backend's error description.
        reason: String,
        /// The backend's reported status code, when present.
        status: Option<u16>,
    },

    /// Failed to parse the backend response.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl IndexError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::TransportError(msg.into())
    }

    /// Create a rejection error.
    pub fn rejected(reason: impl Into<String>, status: Option<u16>) -> Self {
        Self::Rejected {
            reason: reason.into(),
            status,
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// The backend status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the backend rejected the document because its id already exists.
    pub fn is_conflict(&self) -> bool {
        self.status_code() == Some(409)
    }
}
