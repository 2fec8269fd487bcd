//! Tracing layer that streams session log records to a front end.
//!
//! The REPL installs it next to the file appender so warnings raised inside
//! timer completions (failed write-through, dropped replies) reach the
//! terminal even though no command is waiting on them.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One forwarded log record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionLogEntry {
    /// Event target, e.g. "chat_store"
    pub target: String,
    pub level: String,
    pub message: String,
    /// Structured fields other than the message
    pub fields: HashMap<String, Value>,
    pub timestamp: String,
}

/// Forwards events at or above `min_level` to a channel.
pub struct SessionLogLayer {
    sender: mpsc::UnboundedSender<SessionLogEntry>,
    min_level: Level,
}

impl SessionLogLayer {
    /// Forwards WARN and ERROR.
    pub fn new(sender: mpsc::UnboundedSender<SessionLogEntry>) -> Self {
        Self::with_min_level(sender, Level::WARN)
    }

    pub fn with_min_level(sender: mpsc::UnboundedSender<SessionLogEntry>, min_level: Level) -> Self {
        Self { sender, min_level }
    }
}

impl<S> Layer<S> for SessionLogLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // Level ordering: TRACE > DEBUG > INFO > WARN > ERROR
        if *metadata.level() > self.min_level {
            return;
        }

        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));

        let message = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let entry = SessionLogEntry {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // Receiver gone means nobody is listening any more
        let _ = self.sender.send(entry);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), serde_json::json!(value));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(
            field.name().to_string(),
            serde_json::json!(format!("{:?}", value)),
        );
    }
}
