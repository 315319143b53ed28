//! Structured log capture for tests.
//!
//! Capture is scoped with [`tracing::subscriber::with_default`], so parallel
//! tests never see each other's events.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::prelude::*;

/// A captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Storage for captured log entries.
#[derive(Debug, Default)]
pub struct LogStorage {
    entries: Vec<LogEntry>,
}

impl LogStorage {
    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn contains_message(&self, message: &str) -> bool {
        self.entries.iter().any(|e| e.message.contains(message))
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}

/// Layer that records every event it sees into shared storage.
pub struct TestLogLayer {
    storage: Arc<Mutex<LogStorage>>,
}

impl TestLogLayer {
    pub const fn new(storage: Arc<Mutex<LogStorage>>) -> Self {
        Self { storage }
    }
}

impl<S> tracing_subscriber::Layer<S> for TestLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        struct MessageVisitor<'a> {
            message: &'a mut String,
            fields: &'a mut Vec<(String, String)>,
        }

        impl tracing::field::Visit for MessageVisitor<'_> {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    *self.message = value.to_string();
                } else {
                    self.fields
                        .push((field.name().to_string(), value.to_string()));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let value_str = format!("{value:?}");
                if field.name() == "message" {
                    *self.message = value_str;
                } else {
                    self.fields.push((field.name().to_string(), value_str));
                }
            }
        }

        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut MessageVisitor {
            message: &mut message,
            fields: &mut fields,
        });

        self.storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                level: *metadata.level(),
                target: metadata.target().to_string(),
                message,
                fields,
            });
    }
}

/// Run `f` with a capturing subscriber at `level` and return its result
/// together with every event it emitted.
pub fn capture_logs<R>(level: Level, f: impl FnOnce() -> R) -> (R, Vec<LogEntry>) {
    let storage = Arc::new(Mutex::new(LogStorage::default()));
    let subscriber = tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(TestLogLayer::new(Arc::clone(&storage)));
    let result = tracing::subscriber::with_default(subscriber, f);
    let entries = std::mem::take(&mut *storage.lock().unwrap_or_else(PoisonError::into_inner));
    (result, entries.into_entries())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info, warn};

    #[test]
    fn captures_message_and_fields() {
        let ((), logs) = capture_logs(Level::INFO, || {
            info!(skill = "web-framework-react", "tagged");
            debug!("filtered out");
        });
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].message, "tagged");
        assert_eq!(logs[0].field("skill"), Some("web-framework-react"));
    }

    #[test]
    fn storage_queries() {
        let mut storage = LogStorage::default();
        storage.push(LogEntry {
            level: Level::WARN,
            target: "smx".to_string(),
            message: "source unavailable".to_string(),
            fields: Vec::new(),
        });
        assert!(storage.contains_message("unavailable"));
        let ((), logs) = capture_logs(Level::WARN, || warn!("x"));
        assert_eq!(logs[0].level, Level::WARN);
    }
}
