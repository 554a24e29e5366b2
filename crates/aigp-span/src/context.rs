//! Span correlation identifiers carried by governance events.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiers of a span, in W3C Trace Context hex form.
///
/// All fields are empty strings when no span is active. `trace_id` is
/// 32 lowercase hex characters, `span_id` and `parent_span_id` are 16,
/// and `trace_flags` is 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: String,
    pub trace_flags: String,
}

impl SpanContext {
    /// Context used when no span is active.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fresh root context with random identifiers and the sampled flag set.
    pub fn new_root() -> Self {
        Self {
            trace_id: new_trace_id(),
            span_id: new_span_id(),
            parent_span_id: String::new(),
            trace_flags: "01".to_string(),
        }
    }

    /// Child context sharing this context's trace id and flags.
    pub fn new_child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: new_span_id(),
            parent_span_id: self.span_id.clone(),
            trace_flags: self.trace_flags.clone(),
        }
    }

    /// A context is valid when both ids are well-formed and not all zeros.
    pub fn is_valid(&self) -> bool {
        is_hex_id(&self.trace_id, 32) && is_hex_id(&self.span_id, 16)
    }

    /// Parse a `traceparent` header (`00-{trace_id}-{span_id}-{flags}`).
    ///
    /// The parsed span id is the caller's span, so it becomes
    /// `parent_span_id` of the returned context only after `new_child`.
    pub fn from_traceparent(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() || version != "00" {
            return None;
        }
        if flags.len() != 2 || !flags.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let ctx = Self {
            trace_id: trace_id.to_ascii_lowercase(),
            span_id: span_id.to_ascii_lowercase(),
            parent_span_id: String::new(),
            trace_flags: flags.to_ascii_lowercase(),
        };
        ctx.is_valid().then_some(ctx)
    }

    /// Format as a `traceparent` header value, or `None` for an invalid context.
    pub fn to_traceparent(&self) -> Option<String> {
        if !self.is_valid() {
            return None;
        }
        let flags = if self.trace_flags.is_empty() {
            "00"
        } else {
            self.trace_flags.as_str()
        };
        Some(format!("00-{}-{}-{}", self.trace_id, self.span_id, flags))
    }
}

fn is_hex_id(value: &str, len: usize) -> bool {
    value.len() == len
        && value.bytes().all(|b| b.is_ascii_hexdigit())
        && value.bytes().any(|b| b != b'0')
}

fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn new_span_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(16);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context_is_valid() {
        let ctx = SpanContext::new_root();
        assert!(ctx.is_valid());
        assert_eq!(ctx.trace_id.len(), 32);
        assert_eq!(ctx.span_id.len(), 16);
        assert!(ctx.parent_span_id.is_empty());
    }

    #[test]
    fn test_child_links_to_parent() {
        let root = SpanContext::new_root();
        let child = root.new_child();
        assert_eq!(child.trace_id, root.trace_id);
        assert_eq!(child.parent_span_id, root.span_id);
        assert_ne!(child.span_id, root.span_id);
    }

    #[test]
    fn test_empty_context_is_invalid() {
        assert!(!SpanContext::empty().is_valid());
        assert!(SpanContext::empty().to_traceparent().is_none());
    }

    #[test]
    fn test_traceparent_roundtrip() {
        let header = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01";
        let ctx = SpanContext::from_traceparent(header).unwrap();
        assert_eq!(ctx.trace_id, "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id, "00f067aa0ba902b7");
        assert_eq!(ctx.trace_flags, "01");
        assert_eq!(ctx.to_traceparent().as_deref(), Some(header));
    }

    #[test]
    fn test_traceparent_rejects_malformed() {
        assert!(SpanContext::from_traceparent("").is_none());
        assert!(SpanContext::from_traceparent("01-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").is_none());
        assert!(SpanContext::from_traceparent("00-00000000000000000000000000000000-00f067aa0ba902b7-01").is_none());
        assert!(SpanContext::from_traceparent("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7").is_none());
        assert!(SpanContext::from_traceparent("00-xyz-00f067aa0ba902b7-01").is_none());
    }
}
