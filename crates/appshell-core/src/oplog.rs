//! Operational log sink for failures that operators need to see.

use std::fmt::Display;
use std::sync::{Arc, Mutex};

use tracing::error;

/// Receives `error(tag, value)` calls from request handlers.
pub trait LogSink: Send + Sync {
    fn error(&self, tag: &str, error: &dyn Display);
}

impl<T: LogSink + ?Sized> LogSink for Arc<T> {
    fn error(&self, tag: &str, err: &dyn Display) {
        (**self).error(tag, err)
    }
}

/// Forwards entries to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn error(&self, tag: &str, err: &dyn Display) {
        error!(tag, error = %err, "Operation failed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub tag: String,
    pub message: String,
}

/// Keeps every entry in memory, for assertions.
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn error(&self, tag: &str, err: &dyn Display) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                tag: tag.to_string(),
                message: err.to_string(),
            });
        }
    }
}
