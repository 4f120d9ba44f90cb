//! Per-indexer diagnostics handle.
//!
//! Each indexer carries its own level and span instead of adjusting the
//! process-wide subscriber, so two indexers in one process can log at
//! different levels.

use tracing::level_filters::LevelFilter;
use tracing::{Level, Span};

/// Level filter and span for one indexer's diagnostics.
#[derive(Debug, Clone)]
pub struct IndexerLogger {
    level: LevelFilter,
    span: Span,
}

impl IndexerLogger {
    /// Create a logger with the given level and span.
    pub fn new(level: LevelFilter, span: Span) -> Self {
        Self { level, span }
    }

    /// The configured level.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// The span diagnostics are recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Whether records at `level` pass this logger's filter.
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    /// Run `record` inside the span if `level` is enabled.
    pub fn log(&self, level: Level, record: impl FnOnce()) {
        if self.enabled(level) {
            self.span.in_scope(record);
        }
    }
}
