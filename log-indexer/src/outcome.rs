//! Outcome of a single indexing request.

use log_indexer_repository::{IndexError, IndexResponse};
use log_indexer_shared::LogEvent;

use crate::indexer::EventIndexer;

/// The result of indexing one event. Exactly one is produced per request.
#[derive(Debug, Clone)]
pub enum IndexOutcome {
    /// The backend acknowledged the document.
    Indexed(IndexResponse),
    /// The request failed at the transport level or the backend rejected it.
    Failed(IndexFailure),
}

impl IndexOutcome {
    /// Whether the event was indexed.
    pub fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed(_))
    }

    /// Whether indexing failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The backend response, if the event was indexed.
    pub fn response(&self) -> Option<&IndexResponse> {
        match self {
            Self::Indexed(response) => Some(response),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if indexing failed.
    pub fn failure(&self) -> Option<&IndexFailure> {
        match self {
            Self::Indexed(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Convert into a `Result`.
    pub fn into_result(self) -> Result<IndexResponse, IndexFailure> {
        match self {
            Self::Indexed(response) => Ok(response),
            Self::Failed(failure) => Err(failure),
        }
    }
}

/// A failed indexing request.
///
/// Transport errors and backend rejections share this shape.
#[derive(Debug, Clone)]
pub struct IndexFailure {
    /// What went wrong.
    pub error: IndexError,
    /// The event as it was submitted.
    pub event: LogEvent,
    /// The indexer that submitted the event.
    pub indexer: EventIndexer,
}

impl IndexFailure {
    /// The backend status code, when the backend reported one.
    pub fn status_code(&self) -> Option<u16> {
        self.error.status_code()
    }
}
