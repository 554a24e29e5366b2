//! In-memory tracer that tracks the active span.
//!
//! Spans are entered with a guard; the most recently entered span that has
//! not been exited is the current span. Each thread has its own active
//! stack, so concurrent requests on different threads never parent into
//! each other's traces. Every span ever started is kept so tests and
//! exporters can inspect the finished tree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use crate::context::SpanContext;
use crate::span::{RecordingSpan, SpanHandle, SpanRecord, SpanSource};

#[derive(Default)]
struct TracerState {
    active: HashMap<ThreadId, Vec<Arc<RecordingSpan>>>,
    finished: Vec<Arc<RecordingSpan>>,
}

impl TracerState {
    fn current(&self) -> Option<&Arc<RecordingSpan>> {
        self.active.get(&thread::current().id()).and_then(|stack| stack.last())
    }

    fn enter(&mut self, span: &Arc<RecordingSpan>) {
        self.active
            .entry(thread::current().id())
            .or_default()
            .push(Arc::clone(span));
        self.finished.push(Arc::clone(span));
    }
}

/// Tracer that records spans in memory and serves as a `SpanSource`.
#[derive(Default)]
pub struct RecordingTracer {
    state: Mutex<TracerState>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a span and make it current until the guard is dropped.
    ///
    /// The new span is a child of the calling thread's current span, or a
    /// root span on a fresh trace when nothing is active on this thread.
    pub fn start_span(&self, name: &str) -> ActiveSpanGuard<'_> {
        let mut state = self.lock();
        let span = match state.current() {
            Some(parent) => RecordingSpan::new_child(&parent.context(), name),
            None => RecordingSpan::new_root(name),
        };
        let span = Arc::new(span);
        state.enter(&span);
        ActiveSpanGuard { tracer: self, span }
    }

    /// Start a span continuing a remote caller's trace.
    pub fn start_remote_child(&self, remote: &SpanContext, name: &str) -> ActiveSpanGuard<'_> {
        let span = Arc::new(RecordingSpan::new_child(remote, name));
        self.lock().enter(&span);
        ActiveSpanGuard { tracer: self, span }
    }

    /// Snapshots of every span started by this tracer, in start order.
    pub fn records(&self) -> Vec<SpanRecord> {
        self.lock().finished.iter().map(|s| s.record()).collect()
    }

    // A guard may be dropped on another thread than the one that entered it
    fn exit(&self, span: &Arc<RecordingSpan>) {
        span.end();
        let mut state = self.lock();
        let mut emptied = None;
        for (thread_id, stack) in state.active.iter_mut() {
            if let Some(pos) = stack.iter().rposition(|s| Arc::ptr_eq(s, span)) {
                stack.remove(pos);
                if stack.is_empty() {
                    emptied = Some(*thread_id);
                }
                break;
            }
        }
        if let Some(thread_id) = emptied {
            state.active.remove(&thread_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, TracerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SpanSource for RecordingTracer {
    fn current_span(&self) -> Option<Arc<dyn SpanHandle>> {
        self.lock()
            .current()
            .map(|s| Arc::clone(s) as Arc<dyn SpanHandle>)
    }
}

/// Keeps a span current; ends and exits it on drop.
pub struct ActiveSpanGuard<'a> {
    tracer: &'a RecordingTracer,
    span: Arc<RecordingSpan>,
}

impl ActiveSpanGuard<'_> {
    /// The span this guard keeps active.
    pub fn span(&self) -> Arc<RecordingSpan> {
        Arc::clone(&self.span)
    }
}

impl Drop for ActiveSpanGuard<'_> {
    fn drop(&mut self) {
        self.tracer.exit(&self.span);
    }
}
