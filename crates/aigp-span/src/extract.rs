//! Axum extractor for inbound W3C trace context headers.
//!
//! Reads `traceparent`, `tracestate`, and `baggage`. A missing
//! `traceparent` yields no remote parent; a present but malformed one is
//! rejected with 400 so a caller cannot silently detach governance events
//! from its trace. The `aigp` tracestate entry and baggage are kept raw
//! here and decoded by `aigp_core::InboundGovernance`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::context::SpanContext;

/// Trace context received from a remote caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundTraceContext {
    /// The caller's span, if a `traceparent` header was sent.
    pub remote_parent: Option<SpanContext>,
    /// Raw `tracestate` header value (empty if absent).
    pub tracestate: String,
    /// Raw `baggage` header value (empty if absent).
    pub baggage: String,
}

/// Axum extractor wrapping [`InboundTraceContext`].
pub struct TraceContextExtractor(pub InboundTraceContext);

/// Rejection for a malformed `traceparent` header.
pub struct TraceContextRejection {
    message: String,
}

impl IntoResponse for TraceContextRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "INVALID_TRACEPARENT",
                "message": self.message
            })),
        )
            .into_response()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TraceContextExtractor {
    type Rejection = TraceContextRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let header_str = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let remote_parent = match header_str("traceparent") {
            Some(value) => Some(SpanContext::from_traceparent(&value).ok_or_else(|| {
                TraceContextRejection {
                    message: format!("traceparent header is not a valid W3C value: {value}"),
                }
            })?),
            None => None,
        };

        Ok(Self(InboundTraceContext {
            remote_parent,
            tracestate: header_str("tracestate").unwrap_or_default(),
            baggage: header_str("baggage").unwrap_or_default(),
        }))
    }
}
