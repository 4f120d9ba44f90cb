//! Request and response types for document index operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::IndexError;

/// How the backend treats an existing document with the same id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    /// Create the document or replace an existing one.
    #[default]
    Index,
    /// Create the document; fail if the id already exists.
    Create,
}

impl OpType {
    /// The wire name of the operation type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Create => "create",
        }
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to store one document in the search index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRequest {
    /// Target index name.
    pub index: String,
    /// Target document type.
    pub document_type: String,
    /// Document key.
    pub id: String,
    /// Document source.
    pub body: Value,
    /// Indexing mode.
    pub op_type: OpType,
}

impl IndexRequest {
    /// Build a create-only request.
    pub fn create(
        index: impl Into<String>,
        document_type: impl Into<String>,
        id: impl Into<String>,
        body: Value,
    ) -> Self {
        Self {
            index: index.into(),
            document_type: document_type.into(),
            id: id.into(),
            body,
            op_type: OpType::Create,
        }
    }
}

/// The backend's response to a completed index request.
///
/// A completed request may still carry a logical error in its body (for
/// example a version conflict under [`OpType::Create`]). Use
/// [`IndexResponse::error`] to tell the two apart.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexResponse {
    http_status: u16,
    body: Value,
}

impl IndexResponse {
    /// Wrap a raw backend response.
    pub fn new(http_status: u16, body: Value) -> Self {
        Self { http_status, body }
    }

    /// The HTTP status of the response.
    pub fn http_status(&self) -> u16 {
        self.http_status
    }

    /// The raw response body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the response, returning the raw body.
    pub fn into_body(self) -> Value {
        self.body
    }

    /// The id of the indexed document, as reported by the backend.
    pub fn document_id(&self) -> Option<&str> {
        self.body.get("_id").and_then(Value::as_str)
    }

    /// The backend's result string (e.g. "created").
    pub fn result(&self) -> Option<&str> {
        self.body.get("result").and_then(Value::as_str)
    }

    /// The status code reported in the body, falling back to the HTTP status.
    pub fn status(&self) -> u16 {
        self.body
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok())
            .unwrap_or(self.http_status)
    }

    /// Whether the HTTP status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.http_status)
    }

    /// The logical error embedded in the body, if any.
    ///
    /// Falsy values (`null`, `false`, `""`, `0`) mean no error.
    pub fn error(&self) -> Option<String> {
        match self.body.get("error")? {
            Value::Null | Value::Bool(false) => None,
            Value::String(msg) if msg.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(msg) => Some(msg.clone()),
            Value::Object(obj) => {
                let kind = obj.get("type").and_then(Value::as_str);
                let reason = obj.get("reason").and_then(Value::as_str);
                Some(match (kind, reason) {
                    (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
                    (None, Some(reason)) => reason.to_string(),
                    _ => Value::Object(obj.clone()).to_string(),
                })
            }
            other => Some(other.to_string()),
        }
    }

    /// Convert an embedded logical error, or a non-2xx status without one,
    /// into an [`IndexError`].
    pub fn to_error(&self) -> Option<IndexError> {
        if let Some(reason) = self.error() {
            return Some(IndexError::rejected(reason, Some(self.status())));
        }
        if self.is_success() {
            return None;
        }

        let reason = match &self.body {
            Value::Null => format!("HTTP status {}", self.http_status),
            Value::String(text) if text.is_empty() => format!("HTTP status {}", self.http_status),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Some(IndexError::rejected(reason, Some(self.http_status)))
    }
}
