//! Logging service front end.
//!
//! Validates raw JSON log events, fills in missing ids and timestamps and
//! hands valid events to a log listener.

use std::fmt;
use std::sync::Arc;

use log_indexer_shared::{now_rfc3339, EventError, LogEvent};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::indexer::EventListener;

/// A callback for events that fail validation.
pub type InvalidEventHandler = Arc<dyn Fn(InvalidEvent) + Send + Sync>;

/// Reasons a raw log event is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The event is not a JSON object.
    #[error("Event must be a JSON object")]
    NotAnObject,

    /// The event has no `tags` member.
    #[error("Event is missing `tags`")]
    MissingTags,

    /// `tags` is not a non-empty array of strings.
    #[error("Invalid tags: {0}")]
    InvalidTags(String),

    /// `id` is present but not a non-empty string.
    #[error("Invalid event id: {0}")]
    InvalidId(String),
}

impl From<EventError> for ValidationError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::NotAnObject => Self::NotAnObject,
            EventError::InvalidId(id) => Self::InvalidId(id),
            EventError::MissingId => Self::InvalidId("null".to_string()),
        }
    }
}

/// An event that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidEvent {
    /// The event as it was logged.
    pub event: Value,
    /// Why it was rejected.
    pub reason: ValidationError,
}

/// Options for a [`LoggingService`].
pub struct LoggingServiceOptions {
    /// Receives every valid event.
    pub log_listener: EventListener,
    /// Receives every invalid event. When unset, invalid events are logged.
    pub invalid_event_listener: Option<InvalidEventHandler>,
}

/// Validates log events and forwards them to a listener.
#[derive(Clone)]
pub struct LoggingService {
    log_listener: EventListener,
    invalid_event_listener: Option<InvalidEventHandler>,
}

impl LoggingService {
    /// Create a service from its options.
    pub fn new(options: LoggingServiceOptions) -> Self {
        Self {
            log_listener: options.log_listener,
            invalid_event_listener: options.invalid_event_listener,
        }
    }

    /// Log one raw event.
    ///
    /// A valid event is a JSON object whose `tags` is a non-empty array of
    /// strings. A missing `id` is set to a fresh UUIDv4 and a missing `ts`
    /// to the current UTC time before the event reaches the listener.
    pub fn log(&self, event: Value) {
        match prepare(event) {
            Ok(event) => (self.log_listener)(Some(event)),
            Err(invalid) => match &self.invalid_event_listener {
                Some(handler) => handler(invalid),
                None => warn!(reason = %invalid.reason, event = %invalid.event, "Invalid log event"),
            },
        }
    }
}

impl fmt::Debug for LoggingService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingService")
            .field("has_invalid_event_listener", &self.invalid_event_listener.is_some())
            .finish()
    }
}

fn prepare(event: Value) -> Result<LogEvent, InvalidEvent> {
    let Value::Object(fields) = &event else {
        return Err(InvalidEvent {
            event,
            reason: ValidationError::NotAnObject,
        });
    };

    if let Err(reason) = check_tags(fields) {
        return Err(InvalidEvent { event, reason });
    }

    let mut fields = fields.clone();
    if matches!(fields.get("id"), None | Some(Value::Null)) {
        fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    if !fields.contains_key("ts") {
        fields.insert("ts".to_string(), Value::String(now_rfc3339()));
    }

    LogEvent::try_from(Value::Object(fields)).map_err(|e| InvalidEvent {
        event,
        reason: e.into(),
    })
}

fn check_tags(fields: &Map<String, Value>) -> Result<(), ValidationError> {
    match fields.get("tags") {
        None | Some(Value::Null) => Err(ValidationError::MissingTags),
        Some(Value::Array(tags)) if tags.is_empty() => {
            Err(ValidationError::InvalidTags("must not be empty".to_string()))
        }
        Some(Value::Array(tags)) => match tags.iter().find(|t| !t.is_string()) {
            Some(tag) => Err(ValidationError::InvalidTags(format!("{} is not a string", tag))),
            None => Ok(()),
        },
        Some(other) => Err(ValidationError::InvalidTags(format!("{} is not an array", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexerConfig;
    use crate::indexer::EventIndexer;
    use log_indexer_repository::InMemoryIndexProvider;
    use serde_json::json;
    use std::sync::Mutex;

    /// Service whose listener and invalid handler record what they receive.
    fn recording_service() -> (
        LoggingService,
        Arc<Mutex<Vec<LogEvent>>>,
        Arc<Mutex<Vec<InvalidEvent>>>,
    ) {
        let logged = Arc::new(Mutex::new(Vec::new()));
        let invalid = Arc::new(Mutex::new(Vec::new()));

        let logged_sink = logged.clone();
        let invalid_sink = invalid.clone();
        let service = LoggingService::new(LoggingServiceOptions {
            log_listener: Arc::new(move |event: Option<LogEvent>| {
                logged_sink.lock().unwrap().extend(event);
            }),
            invalid_event_listener: Some(Arc::new(move |event: InvalidEvent| {
                invalid_sink.lock().unwrap().push(event);
            })),
        });

        (service, logged, invalid)
    }

    #[test]
    fn test_valid_event_is_forwarded_unchanged() {
        let (service, logged, invalid) = recording_service();

        service.log(json!({
            "id": "evt-1",
            "tags": ["info"],
            "data": "hello",
            "ts": "2024-01-01T00:00:00.000Z"
        }));

        let logged = logged.lock().unwrap();
        assert_eq!(logged.len(), 1);
        assert_eq!(
            logged[0].to_document(),
            json!({
                "id": "evt-1",
                "tags": ["info"],
                "data": "hello",
                "ts": "2024-01-01T00:00:00.000Z"
            })
        );
        assert!(invalid.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_id_and_ts_are_filled() {
        let (service, logged, _) = recording_service();

        service.log(json!({"tags": ["info"], "data": "hello"}));

        let logged = logged.lock().unwrap();
        assert!(Uuid::parse_str(&logged[0].id).is_ok());
        assert!(logged[0].get("ts").and_then(Value::as_str).is_some());
    }

    #[test]
    fn test_invalid_events_go_to_handler() {
        let (service, logged, invalid) = recording_service();

        service.log(json!({"data": "bad event"}));
        service.log(json!("not an object"));
        service.log(json!({"tags": [], "data": "x"}));
        service.log(json!({"tags": ["info", 3]}));
        service.log(json!({"tags": "info"}));
        service.log(json!({"tags": ["info"], "id": 17}));
        service.log(json!({"tags": ["info"], "id": ""}));

        assert!(logged.lock().unwrap().is_empty());

        let invalid = invalid.lock().unwrap();
        let reasons: Vec<_> = invalid.iter().map(|e| e.reason.clone()).collect();
        assert_eq!(reasons[0], ValidationError::MissingTags);
        assert_eq!(reasons[1], ValidationError::NotAnObject);
        assert!(matches!(reasons[2], ValidationError::InvalidTags(_)));
        assert!(matches!(reasons[3], ValidationError::InvalidTags(_)));
        assert!(matches!(reasons[4], ValidationError::InvalidTags(_)));
        assert_eq!(reasons[5], ValidationError::InvalidId("17".to_string()));
        assert!(matches!(reasons[6], ValidationError::InvalidId(_)));

        assert_eq!(invalid[0].event, json!({"data": "bad event"}));
        assert_eq!(invalid[5].event, json!({"tags": ["info"], "id": 17}));
        assert_eq!(invalid[6].event, json!({"tags": ["info"], "id": ""}));
    }

    #[test]
    fn test_invalid_event_without_handler_is_dropped() {
        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = logged.clone();
        let service = LoggingService::new(LoggingServiceOptions {
            log_listener: Arc::new(move |event: Option<LogEvent>| {
                sink.lock().unwrap().extend(event);
            }),
            invalid_event_listener: None,
        });

        service.log(json!({"data": "bad event"}));

        assert!(logged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logging_adapter_indexes_valid_events() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = EventIndexer::new(IndexerConfig::new(provider.clone())).unwrap();
        let mut outcomes = indexer.subscribe();

        let invalid = Arc::new(Mutex::new(Vec::new()));
        let sink = invalid.clone();
        let service = indexer.as_logging_adapter(Some(Arc::new(move |event: InvalidEvent| {
            sink.lock().unwrap().push(event);
        })));

        service.log(json!({"data": "bad event"}));
        service.log(json!({"tags": ["info"], "data": "test message from logging service"}));

        let outcome = outcomes.recv().await.unwrap();
        assert!(outcome.is_indexed());
        assert_eq!(provider.len().await, 1);
        assert_eq!(invalid.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logging_adapter_without_handler() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = EventIndexer::new(IndexerConfig::new(provider.clone())).unwrap();
        let mut outcomes = indexer.subscribe();
        let service = indexer.as_logging_adapter(None);

        service.log(json!({"data": "bad event"}));
        service.log(json!({"tags": ["info"], "data": "ok"}));

        assert!(outcomes.recv().await.unwrap().is_indexed());
        assert_eq!(provider.request_count(), 1);
    }
}
