//! Span correlation seam for AIGP governance events.
//!
//! Governance emission needs only three things from a tracing backend: the
//! identifiers of the active span, a way to attach a named event with
//! attributes, and a way to mark the span as failed. This crate defines
//! that seam and ships an in-memory implementation.
//!
//! # Usage
//!
//! 1. Implement `SpanSource`/`SpanHandle` over your tracing backend, or use
//!    `RecordingTracer` directly.
//! 2. Use `TraceContextExtractor` in Axum handlers to continue a caller's
//!    trace, and decode its governance context with
//!    `aigp_core::InboundGovernance`.
//! 3. Hand the source to the governance emitter.

pub mod context;
pub mod extract;
pub mod span;
pub mod tree;

pub use context::SpanContext;
pub use extract::{InboundTraceContext, TraceContextExtractor};
pub use span::{
    Attributes, NoopSpanSource, RecordingSpan, SpanEvent, SpanHandle, SpanRecord, SpanSource,
    SpanStatus,
};
pub use tree::{ActiveSpanGuard, RecordingTracer};
