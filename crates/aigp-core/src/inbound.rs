//! Governance context received on an inbound request.
//!
//! [`aigp_span::TraceContextExtractor`] hands over the raw `tracestate` and
//! `baggage` headers; this module decodes the `aigp` vendor entry and the
//! allow-listed baggage keys, and turns them into emit options so events
//! recorded by the callee carry the caller's classification.

use std::collections::BTreeMap;

use aigp_span::{InboundTraceContext, SpanContext};

use crate::attributes;
use crate::baggage::{AllowListedBaggage, Baggage};
use crate::emitter::EmitOptions;
use crate::tracestate::{self, GovernanceTraceState};

/// Decoded governance context of one inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundGovernance {
    /// The caller's span, if a `traceparent` header was sent.
    pub remote_parent: Option<SpanContext>,
    /// The decoded `aigp` tracestate entry.
    pub trace_state: GovernanceTraceState,
    /// Allow-listed baggage values; any other baggage key is dropped.
    pub baggage: BTreeMap<String, String>,
}

impl InboundGovernance {
    pub fn from_inbound(inbound: &InboundTraceContext) -> Self {
        let mut baggage = Baggage::from_header(&inbound.baggage);
        let baggage = AllowListedBaggage::new(&mut baggage).extract();
        Self {
            remote_parent: inbound.remote_parent.clone(),
            trace_state: tracestate::extract(&inbound.tracestate),
            baggage,
        }
    }

    /// Data classification, from tracestate first, then baggage.
    pub fn data_classification(&self) -> Option<&str> {
        self.trace_state
            .data_classification
            .as_deref()
            .or_else(|| self.baggage.get(attributes::DATA_CLASSIFICATION).map(String::as_str))
    }

    /// Policy the caller was governed by, from tracestate first, then
    /// baggage. A version that is not a number is read as 0.
    pub fn policy(&self) -> Option<(&str, u32)> {
        match &self.trace_state.policy_name {
            Some(name) => {
                let version = self
                    .trace_state
                    .policy_version
                    .as_deref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0);
                Some((name.as_str(), version))
            }
            None => self
                .baggage
                .get(attributes::POLICY_NAME)
                .map(|name| (name.as_str(), 0)),
        }
    }

    /// Emit options carrying the caller's classification and policy.
    pub fn emit_options(&self) -> EmitOptions {
        let mut opts = EmitOptions::new();
        if let Some(level) = self.data_classification() {
            opts = opts.classification(level);
        }
        if let Some((name, version)) = self.policy() {
            opts = opts.policy(name, version);
        }
        opts
    }
}

impl From<&InboundTraceContext> for InboundGovernance {
    fn from(inbound: &InboundTraceContext) -> Self {
        Self::from_inbound(inbound)
    }
}
