//! The log event record forwarded to the search index.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised when a raw JSON value cannot be turned into a [`LogEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The value is not a JSON object.
    #[error("Event must be a JSON object")]
    NotAnObject,

    /// The object has no `id` member.
    #[error("Event is missing the `id` field")]
    MissingId,

    /// The `id` member is not a non-empty string.
    #[error("Invalid event id: {0}")]
    InvalidId(String),
}

/// A structured log event.
///
/// The `id` is used as the document key in the search index. Every other
/// field is opaque payload and is forwarded to the backend verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Unique event identifier.
    pub id: String,
    /// All remaining event fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogEvent {
    /// Create an event with the `{tags, data, ts, id}` shape, using a fresh
    /// UUIDv4 as id and the current UTC time as timestamp.
    pub fn new<I, S>(tags: I, data: impl Into<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags: Vec<Value> = tags.into_iter().map(|t| Value::String(t.into())).collect();

        let mut fields = Map::new();
        fields.insert("tags".to_string(), Value::Array(tags));
        fields.insert("data".to_string(), data.into());
        fields.insert("ts".to_string(), Value::String(now_rfc3339()));

        Self {
            id: Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Create an event with the given id and no payload.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    /// Set a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "id" {
            self.fields.insert(key, value.into());
        }
        self
    }

    /// Look up a payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The full event, id included, as a JSON document body.
    pub fn to_document(&self) -> Value {
        let mut doc = self.fields.clone();
        doc.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(doc)
    }
}

impl TryFrom<Value> for LogEvent {
    type Error = EventError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut fields) = value else {
            return Err(EventError::NotAnObject);
        };

        let id = match fields.remove("id") {
            None | Some(Value::Null) => return Err(EventError::MissingId),
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(other) => return Err(EventError::InvalidId(other.to_string())),
        };

        Ok(Self { id, fields })
    }
}

impl From<LogEvent> for Value {
    fn from(event: LogEvent) -> Self {
        event.to_document()
    }
}

/// Current UTC time formatted the way log events carry it.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_shape() {
        let event = LogEvent::new(["info"], "test message");

        assert!(Uuid::parse_str(&event.id).is_ok());
        assert_eq!(event.get("tags"), Some(&json!(["info"])));
        assert_eq!(event.get("data"), Some(&json!("test message")));
        assert!(event.get("ts").and_then(Value::as_str).is_some());
    }

    #[test]
    fn test_new_events_have_distinct_ids() {
        let a = LogEvent::new(["info"], "a");
        let b = LogEvent::new(["info"], "b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_try_from_value() {
        let event = LogEvent::try_from(json!({
            "id": "abc",
            "tags": ["warn"],
            "data": {"code": 7}
        }))
        .unwrap();

        assert_eq!(event.id, "abc");
        assert!(event.get("id").is_none());
        assert_eq!(event.get("data"), Some(&json!({"code": 7})));
    }

    #[test]
    fn test_try_from_rejects_bad_values() {
        assert_eq!(
            LogEvent::try_from(json!("nope")),
            Err(EventError::NotAnObject)
        );
        assert_eq!(
            LogEvent::try_from(json!({"data": "bad event"})),
            Err(EventError::MissingId)
        );
        assert!(matches!(
            LogEvent::try_from(json!({"id": 42})),
            Err(EventError::InvalidId(_))
        ));
        assert!(matches!(
            LogEvent::try_from(json!({"id": ""})),
            Err(EventError::InvalidId(_))
        ));
    }

    #[test]
    fn test_to_document_includes_id() {
        let event = LogEvent::with_id("doc-1").with_field("data", "hello");
        assert_eq!(event.to_document(), json!({"id": "doc-1", "data": "hello"}));
    }

    #[test]
    fn test_with_field_ignores_id() {
        let event = LogEvent::with_id("doc-1").with_field("id", "other");
        assert_eq!(event.id, "doc-1");
        assert!(event.fields.is_empty());
    }

    #[test]
    fn test_serde_flattens_payload() {
        let event: LogEvent =
            serde_json::from_value(json!({"id": "x", "tags": ["a"]})).unwrap();
        assert_eq!(event.id, "x");
        assert_eq!(event.get("tags"), Some(&json!(["a"])));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, json!({"id": "x", "tags": ["a"]}));
    }
}
