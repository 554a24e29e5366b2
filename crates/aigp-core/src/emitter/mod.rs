//! Dual/triple-emit dispatcher.
//!
//! Every governance action produces, in this order:
//!
//! 1. a named event with `aigp.*` attributes on the active span
//!    (observability backend)
//! 2. the full [`GovernanceEvent`] handed to the [`EventSink`]
//!    (governance store)
//! 3. optionally, a [`GovernanceRunFacet`] handed to the [`LineageSink`]
//!    (lineage backend)
//!
//! Sink failures, returned errors and panics alike, are logged and counted
//! but never abort the action: the event is always returned to the caller.

mod actions;
mod sequence;
mod sink;

pub use actions::PolicyRef;
pub use sequence::SequenceCounter;
pub use sink::{EventSink, JsonLinesSink, LineageSink};

#[cfg(test)]
pub use sink::{MockEventSink, MockLineageSink};

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use aigp_span::{Attributes, SpanContext, SpanHandle, SpanSource};

use crate::attributes;
use crate::config::EmitterConfig;
use crate::event::{Annotations, EventBuilder, EventType, GovernanceEvent};
use crate::lineage::GovernanceRunFacet;
use crate::metrics::{EmitterMetrics, EVENT_SINK, LINEAGE_SINK};
use crate::signing::{self, SigningKey};

/// Severities that mark the span as failed on a denial
const ERROR_SEVERITIES: [&str; 2] = ["critical", "high"];

/// Optional inputs shared by every governance action.
///
/// Method-specific defaults (for instance severity `medium` on an inject
/// denial) apply only where the corresponding field is left unset here.
#[derive(Clone, Default)]
pub struct EmitOptions {
    pub data_classification: String,
    pub annotations: Annotations,
    /// `event_id` of the event this one causally follows
    pub causality_ref: String,
    /// Annotate this span instead of the current one
    pub span: Option<Arc<dyn SpanHandle>>,
    /// Correlation identifiers that take precedence over the span's
    pub correlation: Option<SpanContext>,
    pub severity: Option<String>,
    pub violation_type: Option<String>,
    pub policy_id: String,
    pub prompt_id: String,
    pub policy: Option<PolicyRef>,
    pub prompt: Option<PolicyRef>,
    pub template_rendered: bool,
    pub request_method: Option<String>,
    pub request_path: String,
    pub source_ip: String,
}

impl EmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classification(mut self, level: impl Into<String>) -> Self {
        self.data_classification = level.into();
        self
    }

    pub fn annotation(mut self, key: impl Into<String>, value: Value) -> Self {
        self.annotations.insert(key.into(), value);
        self
    }

    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn causality_ref(mut self, event_id: impl Into<String>) -> Self {
        self.causality_ref = event_id.into();
        self
    }

    pub fn span(mut self, span: Arc<dyn SpanHandle>) -> Self {
        self.span = Some(span);
        self
    }

    pub fn correlation(mut self, ctx: SpanContext) -> Self {
        self.correlation = Some(ctx);
        self
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn violation_type(mut self, violation_type: impl Into<String>) -> Self {
        self.violation_type = Some(violation_type.into());
        self
    }

    pub fn policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = policy_id.into();
        self
    }

    pub fn prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.prompt_id = prompt_id.into();
        self
    }

    /// Policy recorded on actions that do not take one directly.
    pub fn policy(mut self, name: impl Into<String>, version: u32) -> Self {
        self.policy = Some(PolicyRef::new(name, version));
        self
    }

    /// Prompt recorded on actions that do not take one directly.
    pub fn prompt(mut self, name: impl Into<String>, version: u32) -> Self {
        self.prompt = Some(PolicyRef::new(name, version));
        self
    }

    pub fn template_rendered(mut self, rendered: bool) -> Self {
        self.template_rendered = rendered;
        self
    }

    pub fn request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.request_method = Some(method.into());
        self.request_path = path.into();
        self
    }

    pub fn source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.source_ip = source_ip.into();
        self
    }
}

impl std::fmt::Debug for EmitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitOptions")
            .field("data_classification", &self.data_classification)
            .field("causality_ref", &self.causality_ref)
            .field("has_span", &self.span.is_some())
            .field("correlation", &self.correlation)
            .finish_non_exhaustive()
    }
}

struct EventSigner {
    key: SigningKey,
    key_id: String,
}

/// Governance event emitter for one agent.
///
/// Owns its sequence counter; share the emitter (e.g. behind an `Arc`)
/// rather than creating one per request, or sequence numbers restart.
/// The counter keeps one entry per trace it has seen: call
/// [`end_trace`](Self::end_trace) when a trace's root span closes so a
/// long-lived emitter does not grow without bound.
pub struct GovernanceEmitter {
    config: EmitterConfig,
    spans: Arc<dyn SpanSource>,
    event_sink: Option<Box<dyn EventSink>>,
    lineage_sink: Option<Box<dyn LineageSink>>,
    metrics: Option<EmitterMetrics>,
    signer: Option<EventSigner>,
    sequences: SequenceCounter,
}

impl GovernanceEmitter {
    pub fn new(config: EmitterConfig, spans: Arc<dyn SpanSource>) -> Self {
        Self {
            config,
            spans,
            event_sink: None,
            lineage_sink: None,
            metrics: None,
            signer: None,
            sequences: SequenceCounter::new(),
        }
    }

    /// Send every event to `sink`.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.event_sink = Some(Box::new(sink));
        self
    }

    /// Send the lineage run facet of every event to `sink`.
    pub fn with_lineage_sink(mut self, sink: impl LineageSink + 'static) -> Self {
        self.lineage_sink = Some(Box::new(sink));
        self
    }

    pub fn with_metrics(mut self, metrics: EmitterMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Sign every event before it is emitted.
    ///
    /// An event whose signing fails is still emitted, unsigned.
    pub fn with_signer(mut self, key: SigningKey, key_id: impl Into<String>) -> Self {
        self.signer = Some(EventSigner {
            key,
            key_id: key_id.into(),
        });
        self
    }

    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Process-constant resource attributes for the tracing backend.
    pub fn resource_attributes(&self) -> HashMap<String, String> {
        self.config.resource_attributes()
    }

    pub fn sequences(&self) -> &SequenceCounter {
        &self.sequences
    }

    /// Forget the sequence counter of a finished trace.
    pub fn end_trace(&self, trace_id: &str) {
        self.sequences.end_trace(trace_id);
        tracing::trace!(trace_id = %trace_id, "Ended governance trace");
    }

    /// Builder for `event_type`, pre-filled with agent identity and the
    /// correlation identifiers of the target span.
    pub fn event_builder(&self, event_type: EventType, opts: &EmitOptions) -> (EventBuilder, Option<Arc<dyn SpanHandle>>) {
        let span = opts.span.clone().or_else(|| self.spans.current_span());

        let mut builder = EventBuilder::for_type(event_type, self.config.agent_id.as_str(), "")
            .agent_name(self.config.agent_name.as_str())
            .org(self.config.org_id.as_str(), self.config.org_name.as_str())
            .spec_version(self.config.spec_version.as_str())
            .data_classification(opts.data_classification.as_str())
            .annotations(opts.annotations.clone())
            .policy_id(opts.policy_id.as_str())
            .prompt_id(opts.prompt_id.as_str())
            .template_rendered(opts.template_rendered)
            .source_ip(opts.source_ip.as_str())
            .request(
                opts.request_method.clone().unwrap_or_default(),
                opts.request_path.as_str(),
            );
        if let Some(policy) = &opts.policy {
            builder = builder.policy(policy.name.as_str(), policy.version);
        }
        if let Some(prompt) = &opts.prompt {
            builder = builder.prompt(prompt.name.as_str(), prompt.version);
        }
        if let Some(severity) = &opts.severity {
            builder = builder.severity(severity.as_str());
        }
        if let Some(violation_type) = &opts.violation_type {
            builder = builder.violation_type(violation_type.as_str());
        }
        if let Some(ctx) = &opts.correlation {
            builder = builder.correlate(ctx);
        }
        if let Some(span) = &span {
            builder = builder.correlate(&span.context());
        }
        (builder, span)
    }

    /// Run one full emission for a built event.
    pub fn dispatch(
        &self,
        event_type: EventType,
        builder: EventBuilder,
        span: Option<Arc<dyn SpanHandle>>,
        causality_ref: &str,
    ) -> GovernanceEvent {
        self.dispatch_with(event_type, builder, span, causality_ref, |_| {})
    }

    /// As [`dispatch`](Self::dispatch), letting the caller adjust the span
    /// attributes before they are attached.
    pub fn dispatch_with(
        &self,
        event_type: EventType,
        builder: EventBuilder,
        span: Option<Arc<dyn SpanHandle>>,
        causality_ref: &str,
        adjust_attributes: impl FnOnce(&mut Attributes),
    ) -> GovernanceEvent {
        let mut event = builder.build();

        if !event.trace_id.is_empty() {
            event.sequence_number = self.sequences.next(&event.trace_id);
        }
        if !causality_ref.is_empty() {
            event.causality_ref = causality_ref.to_string();
        }
        if let Some(signer) = &self.signer {
            match signing::sign_event(&event, &signer.key, &signer.key_id) {
                Ok(signed) => event = signed,
                Err(e) => tracing::warn!(
                    event_id = %event.event_id,
                    error = %e,
                    "Emitting governance event unsigned"
                ),
            }
        }

        if let Some(span) = &span {
            let mut attrs = span_attributes(&event);
            adjust_attributes(&mut attrs);
            span.add_event(event_type.span_event_name(), attrs);

            if event.is_denial() && ERROR_SEVERITIES.contains(&event.severity.as_str()) {
                span.set_error(&format!("AIGP: {}", event.event_type));
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_emitted(&event.event_type);
            if let Some(tree) = &event.governance_merkle_tree {
                metrics.observe_merkle_leaves(tree.leaf_count);
            }
        }

        self.deliver(&event);

        tracing::debug!(
            tracer = %self.config.tracer_name,
            event_id = %event.event_id,
            event_type = %event.event_type,
            trace_id = %event.trace_id,
            sequence_number = event.sequence_number,
            "Emitted governance event"
        );

        event
    }

    fn deliver(&self, event: &GovernanceEvent) {
        if let Some(sink) = &self.event_sink {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.send(event)));
            self.report(EVENT_SINK, event, outcome);
        }
        if let Some(sink) = &self.lineage_sink {
            let facet = GovernanceRunFacet::from_event(event);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| sink.send(&facet)));
            self.report(LINEAGE_SINK, event, outcome);
        }
    }

    fn report(
        &self,
        sink: &'static str,
        event: &GovernanceEvent,
        outcome: std::thread::Result<anyhow::Result<()>>,
    ) {
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
        };
        tracing::error!(
            tracer = %self.config.tracer_name,
            sink,
            event_id = %event.event_id,
            event_type = %event.event_type,
            error = %failure,
            "AIGP sink failed"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_sink_failure(sink);
        }
    }
}

impl std::fmt::Debug for GovernanceEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceEmitter")
            .field("config", &self.config)
            .field("has_event_sink", &self.event_sink.is_some())
            .field("has_lineage_sink", &self.lineage_sink.is_some())
            .field("signing", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Flat span attributes derived from an event.
///
/// Optional values are included only when set.
pub fn span_attributes(event: &GovernanceEvent) -> Attributes {
    let mut attrs = Attributes::new();
    let mut put = |key: &str, value: Value| {
        attrs.insert(key.to_string(), value);
    };

    put(attributes::EVENT_ID, Value::from(event.event_id.to_string()));
    put(attributes::EVENT_TYPE, Value::from(event.event_type.as_str()));
    put(attributes::EVENT_CATEGORY, Value::from(event.event_category.as_str()));

    if !event.governance_hash.is_empty() {
        put(attributes::GOVERNANCE_HASH, Value::from(event.governance_hash.as_str()));
        put(attributes::GOVERNANCE_HASH_TYPE, Value::from(event.hash_type.as_str()));
    }
    if !event.data_classification.is_empty() {
        put(attributes::DATA_CLASSIFICATION, Value::from(event.data_classification.as_str()));
    }

    if !event.policy_id.is_empty() {
        put(attributes::POLICY_ID, Value::from(event.policy_id.as_str()));
    }
    if !event.policy_name.is_empty() {
        put(attributes::POLICY_NAME, Value::from(event.policy_name.as_str()));
    }
    if event.policy_version > 0 {
        put(attributes::POLICY_VERSION, Value::from(event.policy_version));
    }
    if !event.prompt_id.is_empty() {
        put(attributes::PROMPT_ID, Value::from(event.prompt_id.as_str()));
    }
    if !event.prompt_name.is_empty() {
        put(attributes::PROMPT_NAME, Value::from(event.prompt_name.as_str()));
    }
    if event.prompt_version > 0 {
        put(attributes::PROMPT_VERSION, Value::from(event.prompt_version));
    }

    put(attributes::ENFORCEMENT_RESULT, Value::from(event.enforcement_result()));

    for (key, value) in [
        (attributes::SEVERITY, &event.severity),
        (attributes::VIOLATION_TYPE, &event.violation_type),
        (attributes::DENIAL_REASON, &event.denial_reason),
    ] {
        if !value.is_empty() {
            put(key, Value::from(value.as_str()));
        }
    }

    if let Some(tree) = &event.governance_merkle_tree {
        put(attributes::MERKLE_LEAF_COUNT, Value::from(tree.leaf_count));
    }

    if !event.event_signature.is_empty() {
        put(attributes::EVENT_SIGNATURE, Value::from(event.event_signature.as_str()));
    }
    if !event.signature_key_id.is_empty() {
        put(attributes::SIGNATURE_KEY_ID, Value::from(event.signature_key_id.as_str()));
    }
    if event.sequence_number > 0 {
        put(attributes::SEQUENCE_NUMBER, Value::from(event.sequence_number));
    }
    if !event.causality_ref.is_empty() {
        put(attributes::CAUSALITY_REF, Value::from(event.causality_ref.as_str()));
    }

    attrs
}
