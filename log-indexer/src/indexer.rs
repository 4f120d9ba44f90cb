//! The event indexer.
//!
//! Submits one create-only document request per log event and reports the
//! outcome of each request.

use std::fmt;
use std::sync::Arc;

use log_indexer_repository::{DocumentIndexProvider, IndexError, IndexRequest};
use log_indexer_shared::LogEvent;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info_span, Instrument, Level};

use crate::config::{ConfigError, IndexerConfig};
use crate::logger::IndexerLogger;
use crate::logging_service::{InvalidEventHandler, LoggingService, LoggingServiceOptions};
use crate::outcome::{IndexFailure, IndexOutcome};

/// A callback that consumes log events. `None` is ignored.
pub type EventListener = Arc<dyn Fn(Option<LogEvent>) + Send + Sync>;

struct Inner {
    client: Arc<dyn DocumentIndexProvider>,
    index_name: String,
    document_type: String,
    logger: IndexerLogger,
    runtime: Handle,
    notifier: broadcast::Sender<IndexOutcome>,
}

/// Forwards log events to the search index.
///
/// Each call to [`EventIndexer::index_event`] issues one independent request.
/// Requests run concurrently with no ordering between their completions.
/// The indexer is cheap to clone; clones share configuration and
/// subscribers.
///
/// # Example
///
/// ```ignore
/// let indexer = EventIndexer::new(IndexerConfig::new(Arc::new(client)))?;
/// let mut outcomes = indexer.subscribe();
///
/// indexer.index_event(LogEvent::new(["info"], "started"));
/// match outcomes.recv().await? {
///     IndexOutcome::Indexed(response) => println!("stored {:?}", response.document_id()),
///     IndexOutcome::Failed(failure) => eprintln!("{}", failure.error),
/// }
/// ```
#[derive(Clone)]
pub struct EventIndexer {
    inner: Arc<Inner>,
}

impl EventIndexer {
    /// Create an indexer from a config.
    ///
    /// Must be called within a Tokio runtime; requests are spawned on that
    /// runtime even when `index_event` is called from another thread.
    ///
    /// # Returns
    ///
    /// * `Ok(EventIndexer)` - A ready indexer
    /// * `Err(ConfigError)` - If the config is missing its client or is malformed
    pub fn new(config: IndexerConfig) -> Result<Self, ConfigError> {
        let settings = config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;

        let span = settings.span.unwrap_or_else(|| {
            info_span!(
                "event_indexer",
                index = %settings.index_name,
                document_type = %settings.document_type
            )
        });
        let logger = IndexerLogger::new(settings.log_level, span);
        let (notifier, _) = broadcast::channel(settings.notification_capacity);

        logger.log(Level::DEBUG, || {
            debug!(
                index = %settings.index_name,
                document_type = %settings.document_type,
                log_level = %settings.log_level,
                notification_capacity = settings.notification_capacity,
                "Created EventIndexer"
            )
        });

        Ok(Self {
            inner: Arc::new(Inner {
                client: settings.client,
                index_name: settings.index_name,
                document_type: settings.document_type,
                logger,
                runtime,
                notifier,
            }),
        })
    }

    /// The index events are stored in.
    pub fn index_name(&self) -> &str {
        &self.inner.index_name
    }

    /// The document type events are stored as.
    pub fn document_type(&self) -> &str {
        &self.inner.document_type
    }

    /// The level of the indexer's own diagnostics.
    pub fn log_level(&self) -> LevelFilter {
        self.inner.logger.level()
    }

    /// Whether both handles refer to the same indexer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Receive the outcome of every request submitted after this call.
    ///
    /// A subscriber that falls more than the configured notification
    /// capacity behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<IndexOutcome> {
        self.inner.notifier.subscribe()
    }

    /// Submit one event for indexing and return immediately.
    ///
    /// A `None` event is ignored: no request is made and nothing is
    /// notified. Otherwise the request runs as its own task; its outcome is
    /// sent to every subscriber and is also the output of the returned
    /// handle. Dropping the handle does not cancel the request.
    pub fn index_event(&self, event: impl Into<Option<LogEvent>>) -> Option<JoinHandle<IndexOutcome>> {
        let event = event.into()?;
        let indexer = self.clone();
        Some(
            self.inner
                .runtime
                .spawn(async move { indexer.index(event).await }),
        )
    }

    /// Index one event on the current task and return its outcome.
    ///
    /// The outcome is also sent to every subscriber.
    pub async fn index(&self, event: LogEvent) -> IndexOutcome {
        let request = IndexRequest::create(
            self.inner.index_name.as_str(),
            self.inner.document_type.as_str(),
            event.id.as_str(),
            event.to_document(),
        );

        let result = self
            .inner
            .client
            .index_document(&request)
            .instrument(self.inner.logger.span().clone())
            .await;

        let outcome = match result {
            Ok(response) => match response.to_error() {
                None => {
                    self.inner.logger.log(Level::DEBUG, || {
                        debug!(id = %event.id, status = response.http_status(), "Indexed event")
                    });
                    IndexOutcome::Indexed(response)
                }
                Some(rejection) => {
                    self.inner.logger.log(Level::DEBUG, || {
                        debug!(id = %event.id, error = %rejection, "Backend rejected event")
                    });
                    self.failure(rejection, event)
                }
            },
            Err(err) => {
                self.inner.logger.log(Level::ERROR, || {
                    error!(id = %event.id, error = %err, "Failed to index event")
                });
                self.failure(err, event)
            }
        };

        // No subscribers is not an error.
        let _ = self.inner.notifier.send(outcome.clone());
        outcome
    }

    /// A listener bound to this indexer, with the same behavior as
    /// [`EventIndexer::index_event`].
    pub fn as_listener(&self) -> EventListener {
        let indexer = self.clone();
        Arc::new(move |event: Option<LogEvent>| {
            indexer.index_event(event);
        })
    }

    /// Wrap this indexer's listener in a [`LoggingService`].
    ///
    /// Events the service rejects go to `invalid_event_handler`, or are
    /// logged when no handler is given.
    pub fn as_logging_adapter(
        &self,
        invalid_event_handler: Option<InvalidEventHandler>,
    ) -> LoggingService {
        LoggingService::new(LoggingServiceOptions {
            log_listener: self.as_listener(),
            invalid_event_listener: invalid_event_handler,
        })
    }

    fn failure(&self, error: IndexError, event: LogEvent) -> IndexOutcome {
        IndexOutcome::Failed(IndexFailure {
            error,
            event,
            indexer: self.clone(),
        })
    }
}

impl fmt::Debug for EventIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventIndexer")
            .field("index_name", &self.inner.index_name)
            .field("document_type", &self.inner.document_type)
            .field("log_level", &self.inner.logger.level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use log_indexer_repository::{InMemoryIndexProvider, IndexResponse};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    fn indexer_with(provider: Arc<InMemoryIndexProvider>) -> EventIndexer {
        EventIndexer::new(IndexerConfig::new(provider).with_log_level("DEBUG")).unwrap()
    }

    fn event() -> LogEvent {
        LogEvent::new(["info"], "test message from indexer.index_event")
    }

    /// Mock provider that records requests and returns a canned body.
    struct RecordingProvider {
        requests: Mutex<Vec<IndexRequest>>,
        status: u16,
        body: serde_json::Value,
    }

    impl RecordingProvider {
        fn replying(status: u16, body: serde_json::Value) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                status,
                body,
            }
        }
    }

    #[async_trait]
    impl DocumentIndexProvider for RecordingProvider {
        async fn index_document(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(IndexResponse::new(self.status, self.body.clone()))
        }
    }

    /// Mock provider that completes requests in reverse submission order.
    struct SlowProvider {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl DocumentIndexProvider for SlowProvider {
        async fn index_document(&self, request: &IndexRequest) -> Result<IndexResponse, IndexError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let delay: u64 = request.body["delay"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(IndexResponse::new(201, json!({"_id": request.id, "result": "created"})))
        }
    }

    #[tokio::test]
    async fn test_construction_succeeds_with_client() {
        let indexer = indexer_with(Arc::new(InMemoryIndexProvider::new()));

        assert_eq!(indexer.index_name(), "log");
        assert_eq!(indexer.document_type(), "event");
        assert_eq!(indexer.log_level(), LevelFilter::DEBUG);
    }

    #[tokio::test]
    async fn test_construction_fails_without_client() {
        let result = EventIndexer::new(IndexerConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingClient)));
    }

    #[test]
    fn test_construction_fails_outside_runtime() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let result = EventIndexer::new(IndexerConfig::new(provider));
        assert!(matches!(result, Err(ConfigError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_index_event_success() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();
        let event = event();

        let outcome = indexer.index_event(event.clone()).unwrap().await.unwrap();

        let response = outcome.response().unwrap();
        assert_eq!(response.document_id(), Some(event.id.as_str()));
        assert_eq!(response.result(), Some("created"));

        let notified = outcomes.recv().await.unwrap();
        assert!(notified.is_indexed());
        assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));

        assert_eq!(provider.document("log", &event.id).await, Some(event.to_document()));
    }

    #[tokio::test]
    async fn test_request_is_create_only_with_full_event_body() {
        let provider = Arc::new(RecordingProvider::replying(201, json!({"result": "created"})));
        let indexer = EventIndexer::new(
            IndexerConfig::new(provider.clone())
                .with_index_name("audit")
                .with_document_type("entry"),
        )
        .unwrap();
        let event = LogEvent::with_id("evt-1").with_field("data", json!({"user": "alice"}));

        indexer.index(event).await;

        let requests = provider.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            IndexRequest::create("audit", "entry", "evt-1", json!({"id": "evt-1", "data": {"user": "alice"}}))
        );
    }

    #[tokio::test]
    async fn test_same_id_twice_yields_success_then_failure() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();
        let event = event();

        let first = indexer.index_event(event.clone()).unwrap().await.unwrap();
        let second = indexer.index_event(event.clone()).unwrap().await.unwrap();

        assert!(first.is_indexed());
        let failure = second.failure().unwrap();
        assert!(matches!(failure.error, IndexError::Rejected { .. }));
        assert_eq!(failure.status_code(), Some(409));
        assert_eq!(failure.event, event);
        assert!(failure.indexer.ptr_eq(&indexer));

        assert!(outcomes.recv().await.unwrap().is_indexed());
        assert!(outcomes.recv().await.unwrap().is_failed());
        assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_rejection_without_status_uses_http_status() {
        let provider = Arc::new(RecordingProvider::replying(
            200,
            json!({"error": "index is read-only"}),
        ));
        let indexer = EventIndexer::new(IndexerConfig::new(provider)).unwrap();

        let outcome = indexer.index(event()).await;

        let failure = outcome.into_result().unwrap_err();
        assert_eq!(failure.error, IndexError::rejected("index is read-only", Some(200)));
    }

    #[tokio::test]
    async fn test_forbidden_response_is_a_failure() {
        let provider = Arc::new(RecordingProvider::replying(403, json!({"message": "Forbidden"})));
        let indexer = EventIndexer::new(IndexerConfig::new(provider.clone())).unwrap();
        let mut outcomes = indexer.subscribe();
        let event = event();

        let outcome = indexer.index(event.clone()).await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.status_code(), Some(403));
        assert_eq!(failure.event, event);
        assert!(outcomes.recv().await.unwrap().is_failed());
        assert_eq!(provider.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falsy_error_field_is_indexed() {
        let provider = Arc::new(RecordingProvider::replying(
            201,
            json!({"error": false, "result": "created"}),
        ));
        let indexer = EventIndexer::new(IndexerConfig::new(provider)).unwrap();

        let outcome = indexer.index(event()).await;

        assert!(outcome.is_indexed());
    }

    #[tokio::test]
    async fn test_transport_failure_is_notified() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        provider.fail_with("connection refused").await;
        let indexer = indexer_with(provider);
        let mut outcomes = indexer.subscribe();
        let event = event();

        let handle = indexer.index_event(event.clone()).unwrap();

        let notified = outcomes.recv().await.unwrap();
        let failure = notified.failure().unwrap();
        assert_eq!(failure.error, IndexError::transport("connection refused"));
        assert_eq!(failure.status_code(), None);
        assert_eq!(failure.event, event);
        assert!(failure.indexer.ptr_eq(&indexer));

        assert!(handle.await.unwrap().is_failed());
    }

    #[tokio::test]
    async fn test_index_event_none_is_noop() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();

        assert!(indexer.index_event(None).is_none());
        tokio::task::yield_now().await;

        assert_eq!(provider.request_count(), 0);
        assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_ten_events_each_notified_once() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();

        let handles: Vec<_> = (0..10)
            .filter_map(|_| indexer.index_event(event()))
            .collect();
        let results = futures::future::join_all(handles).await;

        assert!(results.into_iter().all(|r| r.unwrap().is_indexed()));
        for _ in 0..10 {
            assert!(outcomes.recv().await.unwrap().is_indexed());
        }
        assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(provider.len().await, 10);
    }

    #[tokio::test]
    async fn test_requests_run_concurrently_without_ordering() {
        let provider = Arc::new(SlowProvider {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        let indexer = EventIndexer::new(IndexerConfig::new(provider.clone())).unwrap();
        let mut outcomes = indexer.subscribe();

        let slow = LogEvent::with_id("slow").with_field("delay", 200);
        let fast = LogEvent::with_id("fast").with_field("delay", 10);
        let handles = vec![
            indexer.index_event(slow).unwrap(),
            indexer.index_event(fast).unwrap(),
        ];

        let first = outcomes.recv().await.unwrap();
        assert_eq!(first.response().unwrap().document_id(), Some("fast"));

        futures::future::join_all(handles).await;
        assert_eq!(provider.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_listener_matches_index_event() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();
        let listener = indexer.as_listener();
        let event = event();

        listener(Some(event.clone()));
        assert!(outcomes.recv().await.unwrap().is_indexed());

        listener(Some(event.clone()));
        let failure = outcomes.recv().await.unwrap().into_result().unwrap_err();
        assert_eq!(failure.status_code(), Some(409));
        assert_eq!(failure.event, event);

        listener(None);
        tokio::task::yield_now().await;
        assert!(matches!(outcomes.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(provider.request_count(), 2);
    }

    #[tokio::test]
    async fn test_index_event_from_non_runtime_thread() {
        let provider = Arc::new(InMemoryIndexProvider::new());
        let indexer = indexer_with(provider.clone());
        let mut outcomes = indexer.subscribe();

        let listener = indexer.as_listener();
        std::thread::spawn(move || listener(Some(event())))
            .join()
            .unwrap();

        assert!(outcomes.recv().await.unwrap().is_indexed());
        assert_eq!(provider.len().await, 1);
    }

    #[tokio::test]
    async fn test_subscribers_each_receive_outcome() {
        let indexer = indexer_with(Arc::new(InMemoryIndexProvider::new()));
        let mut a = indexer.subscribe();
        let mut b = indexer.subscribe();

        indexer.index(event()).await;

        assert!(a.recv().await.unwrap().is_indexed());
        assert!(b.recv().await.unwrap().is_indexed());
    }

    #[tokio::test]
    async fn test_custom_span_is_used() {
        let span = tracing::info_span!("custom_indexer");
        let indexer = EventIndexer::new(
            IndexerConfig::new(Arc::new(InMemoryIndexProvider::new())).with_span(span),
        )
        .unwrap();

        assert!(indexer.index(event()).await.is_indexed());
        assert!(format!("{:?}", indexer).contains("\"log\""));
    }
}
