//! Span handle seam and the recorded span types.
//!
//! `SpanHandle` is the narrow interface governance emission needs from a
//! tracing backend: read the span's identifiers, attach a named event, and
//! mark the span as failed. `RecordingSpan` is an in-memory implementation
//! that keeps everything it is given, for tests and for deployments that
//! export spans themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::context::SpanContext;

/// Key/value attributes attached to a span event.
pub type Attributes = HashMap<String, serde_json::Value>;

/// Status of a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    Unset,
    Ok,
    Error,
}

/// A named, timestamped event recorded on a span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub attributes: Attributes,
}

/// Operations governance emission performs on a span.
pub trait SpanHandle: Send + Sync {
    /// Identifiers of this span.
    fn context(&self) -> SpanContext;

    /// Attach a named event carrying `attributes`.
    fn add_event(&self, name: &str, attributes: Attributes);

    /// Mark the span as failed with `message`.
    fn set_error(&self, message: &str);
}

/// Source of the currently active span.
pub trait SpanSource: Send + Sync {
    /// The active span, or `None` when nothing is being traced.
    fn current_span(&self) -> Option<Arc<dyn SpanHandle>>;
}

/// Source that never has an active span.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpanSource;

impl SpanSource for NoopSpanSource {
    fn current_span(&self) -> Option<Arc<dyn SpanHandle>> {
        None
    }
}

/// Snapshot of everything a `RecordingSpan` has been given.
///
/// JSON-serializable without loss so recorded spans can be exported as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanRecord {
    pub context: SpanContext,
    pub name: String,
    pub status: SpanStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub events: Vec<SpanEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// In-memory span that records events and status changes.
#[derive(Debug)]
pub struct RecordingSpan {
    inner: Mutex<SpanRecord>,
}

impl RecordingSpan {
    /// Create a running span with the given context.
    pub fn new(context: SpanContext, name: &str) -> Self {
        Self {
            inner: Mutex::new(SpanRecord {
                context,
                name: name.to_string(),
                status: SpanStatus::Unset,
                started_at: Utc::now(),
                ended_at: None,
                duration_ms: None,
                events: Vec::new(),
                error: None,
            }),
        }
    }

    /// Create a root span on a fresh trace.
    pub fn new_root(name: &str) -> Self {
        Self::new(SpanContext::new_root(), name)
    }

    /// Create a span parented to `parent`.
    pub fn new_child(parent: &SpanContext, name: &str) -> Self {
        Self::new(parent.new_child(), name)
    }

    /// Mark the span as ended. An error status set earlier is kept.
    pub fn end(&self) {
        let mut record = self.lock();
        let now = Utc::now();
        if record.status == SpanStatus::Unset {
            record.status = SpanStatus::Ok;
        }
        record.ended_at = Some(now);
        record.duration_ms = Some((now - record.started_at).num_milliseconds().max(0) as u64);
    }

    /// Copy of the current record.
    pub fn record(&self) -> SpanRecord {
        self.lock().clone()
    }

    /// Events recorded so far.
    pub fn events(&self) -> Vec<SpanEvent> {
        self.lock().events.clone()
    }

    pub fn status(&self) -> SpanStatus {
        self.lock().status
    }

    fn lock(&self) -> MutexGuard<'_, SpanRecord> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SpanHandle for RecordingSpan {
    fn context(&self) -> SpanContext {
        self.lock().context.clone()
    }

    fn add_event(&self, name: &str, attributes: Attributes) {
        self.lock().events.push(SpanEvent {
            name: name.to_string(),
            timestamp: Utc::now(),
            attributes,
        });
    }

    fn set_error(&self, message: &str) {
        let mut record = self.lock();
        record.status = SpanStatus::Error;
        record.error = Some(message.to_string());
    }
}
