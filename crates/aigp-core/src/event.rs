//! Governance event record and its builder.
//!
//! A `GovernanceEvent` always carries every field. Optional values default
//! to empty strings, zero, `false`, or an empty map, so the record has the
//! same shape whatever the event type. Only `governance_merkle_tree` is
//! omitted from the serialized form when absent.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use aigp_span::SpanContext;

use crate::attributes::{self, events};
use crate::merkle::{MerkleTree, FLAT_HASH_TYPE};

/// Schema version stamped on every event
pub const SPEC_VERSION: &str = "0.8.0";

/// Free-form informational context; never fed into the governance hash.
pub type Annotations = HashMap<String, serde_json::Value>;

/// The attestation record produced for one governed action.
///
/// Deserialization rejects unknown fields: a field the struct would drop
/// could not be covered by a signature check on the parsed event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GovernanceEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_category: String,
    #[serde(with = "millis_timestamp")]
    pub event_time: DateTime<Utc>,
    pub agent_id: String,
    pub governance_hash: String,
    pub trace_id: String,

    // Span correlation
    pub span_id: String,
    pub parent_span_id: String,
    pub trace_flags: String,

    // Agent and organization
    pub agent_name: String,
    pub org_id: String,
    pub org_name: String,

    pub policy_id: String,
    pub policy_name: String,
    pub policy_version: u32,

    pub prompt_id: String,
    pub prompt_name: String,
    pub prompt_version: u32,

    pub hash_type: String,
    pub data_classification: String,
    pub template_rendered: bool,

    // Denial
    pub denial_reason: String,
    pub violation_type: String,
    pub severity: String,

    // Request
    pub source_ip: String,
    pub request_method: String,
    pub request_path: String,

    // Memory and model state
    pub query_hash: String,
    pub previous_hash: String,

    #[serde(default)]
    pub annotations: Annotations,

    // Proof integrity
    pub event_signature: String,
    pub signature_key_id: String,
    pub sequence_number: u64,
    pub causality_ref: String,

    pub spec_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub governance_merkle_tree: Option<MerkleTree>,
}

impl GovernanceEvent {
    /// Start building an event.
    pub fn builder(
        event_type: impl Into<String>,
        event_category: impl Into<String>,
        agent_id: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> EventBuilder {
        EventBuilder::new(event_type, event_category, agent_id, trace_id)
    }

    /// Whether the event type marks a denied, violating, or blocked action
    pub fn is_denial(&self) -> bool {
        attributes::is_denial_event_type(&self.event_type)
    }

    /// `allowed` or `denied`
    pub fn enforcement_result(&self) -> &'static str {
        attributes::enforcement_result(&self.event_type)
    }

    pub fn is_signed(&self) -> bool {
        !self.event_signature.is_empty()
    }

    /// Number of governed resources behind the hash (1 for a flat hash).
    pub fn leaf_count(&self) -> usize {
        self.governance_merkle_tree
            .as_ref()
            .map(|t| t.leaf_count)
            .unwrap_or(1)
    }

    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} seq={} hash={} ({})",
            self.agent_id,
            self.event_type,
            self.sequence_number,
            self.governance_hash,
            self.hash_type,
        )
    }
}

/// Builder for [`GovernanceEvent`] with documented defaults.
///
/// `event_id` and `event_time` are assigned by [`EventBuilder::build`].
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: GovernanceEvent,
}

impl EventBuilder {
    pub fn new(
        event_type: impl Into<String>,
        event_category: impl Into<String>,
        agent_id: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self {
            event: GovernanceEvent {
                event_id: Uuid::nil(),
                event_type: event_type.into(),
                event_category: event_category.into(),
                event_time: DateTime::<Utc>::UNIX_EPOCH,
                agent_id: agent_id.into(),
                governance_hash: String::new(),
                trace_id: trace_id.into(),
                span_id: String::new(),
                parent_span_id: String::new(),
                trace_flags: String::new(),
                agent_name: String::new(),
                org_id: String::new(),
                org_name: String::new(),
                policy_id: String::new(),
                policy_name: String::new(),
                policy_version: 0,
                prompt_id: String::new(),
                prompt_name: String::new(),
                prompt_version: 0,
                hash_type: FLAT_HASH_TYPE.to_string(),
                data_classification: String::new(),
                template_rendered: false,
                denial_reason: String::new(),
                violation_type: String::new(),
                severity: String::new(),
                source_ip: String::new(),
                request_method: String::new(),
                request_path: String::new(),
                query_hash: String::new(),
                previous_hash: String::new(),
                annotations: Annotations::new(),
                event_signature: String::new(),
                signature_key_id: String::new(),
                sequence_number: 0,
                causality_ref: String::new(),
                spec_version: SPEC_VERSION.to_string(),
                governance_merkle_tree: None,
            },
        }
    }

    /// Builder for a catalogued event type, with its category.
    pub fn for_type(
        event_type: EventType,
        agent_id: impl Into<String>,
        trace_id: impl Into<String>,
    ) -> Self {
        Self::new(event_type.as_str(), event_type.category(), agent_id, trace_id)
    }

    pub fn trace_id(&self) -> &str {
        &self.event.trace_id
    }

    /// Fill correlation fields that were not supplied explicitly.
    pub fn correlate(mut self, ctx: &SpanContext) -> Self {
        let event = &mut self.event;
        if event.trace_id.is_empty() {
            event.trace_id = ctx.trace_id.clone();
        }
        if event.span_id.is_empty() {
            event.span_id = ctx.span_id.clone();
        }
        if event.parent_span_id.is_empty() {
            event.parent_span_id = ctx.parent_span_id.clone();
        }
        if event.trace_flags.is_empty() {
            event.trace_flags = ctx.trace_flags.clone();
        }
        self
    }

    pub fn span_id(mut self, span_id: impl Into<String>) -> Self {
        self.event.span_id = span_id.into();
        self
    }

    pub fn parent_span_id(mut self, parent_span_id: impl Into<String>) -> Self {
        self.event.parent_span_id = parent_span_id.into();
        self
    }

    pub fn trace_flags(mut self, trace_flags: impl Into<String>) -> Self {
        self.event.trace_flags = trace_flags.into();
        self
    }

    pub fn governance_hash(mut self, hash: impl Into<String>) -> Self {
        self.event.governance_hash = hash.into();
        self
    }

    /// Defaults to `sha256`.
    pub fn hash_type(mut self, hash_type: impl Into<String>) -> Self {
        self.event.hash_type = hash_type.into();
        self
    }

    /// Set the Merkle tree; `None` keeps the event flat.
    pub fn merkle_tree(mut self, tree: Option<MerkleTree>) -> Self {
        self.event.governance_merkle_tree = tree;
        self
    }

    pub fn agent_name(mut self, agent_name: impl Into<String>) -> Self {
        self.event.agent_name = agent_name.into();
        self
    }

    pub fn org(mut self, org_id: impl Into<String>, org_name: impl Into<String>) -> Self {
        self.event.org_id = org_id.into();
        self.event.org_name = org_name.into();
        self
    }

    pub fn policy_id(mut self, policy_id: impl Into<String>) -> Self {
        self.event.policy_id = policy_id.into();
        self
    }

    pub fn policy(mut self, name: impl Into<String>, version: u32) -> Self {
        self.event.policy_name = name.into();
        self.event.policy_version = version;
        self
    }

    pub fn prompt_id(mut self, prompt_id: impl Into<String>) -> Self {
        self.event.prompt_id = prompt_id.into();
        self
    }

    pub fn prompt(mut self, name: impl Into<String>, version: u32) -> Self {
        self.event.prompt_name = name.into();
        self.event.prompt_version = version;
        self
    }

    pub fn data_classification(mut self, classification: impl Into<String>) -> Self {
        self.event.data_classification = classification.into();
        self
    }

    pub fn template_rendered(mut self, rendered: bool) -> Self {
        self.event.template_rendered = rendered;
        self
    }

    pub fn denial_reason(mut self, reason: impl Into<String>) -> Self {
        self.event.denial_reason = reason.into();
        self
    }

    pub fn violation_type(mut self, violation_type: impl Into<String>) -> Self {
        self.event.violation_type = violation_type.into();
        self
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.event.severity = severity.into();
        self
    }

    pub fn source_ip(mut self, source_ip: impl Into<String>) -> Self {
        self.event.source_ip = source_ip.into();
        self
    }

    pub fn request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.event.request_method = method.into();
        self.event.request_path = path.into();
        self
    }

    pub fn query_hash(mut self, hash: impl Into<String>) -> Self {
        self.event.query_hash = hash.into();
        self
    }

    pub fn previous_hash(mut self, hash: impl Into<String>) -> Self {
        self.event.previous_hash = hash.into();
        self
    }

    /// Replace all annotations.
    pub fn annotations(mut self, annotations: Annotations) -> Self {
        self.event.annotations = annotations;
        self
    }

    /// Add or overwrite one annotation.
    pub fn annotation(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.event.annotations.insert(key.into(), value);
        self
    }

    pub fn signature(mut self, signature: impl Into<String>, key_id: impl Into<String>) -> Self {
        self.event.event_signature = signature.into();
        self.event.signature_key_id = key_id.into();
        self
    }

    pub fn sequence_number(mut self, sequence_number: u64) -> Self {
        self.event.sequence_number = sequence_number;
        self
    }

    pub fn causality_ref(mut self, event_id: impl Into<String>) -> Self {
        self.event.causality_ref = event_id.into();
        self
    }

    /// Defaults to [`SPEC_VERSION`].
    pub fn spec_version(mut self, version: impl Into<String>) -> Self {
        self.event.spec_version = version.into();
        self
    }

    /// Assign a fresh event id and the current time, truncated to milliseconds.
    pub fn build(mut self) -> GovernanceEvent {
        let now = Utc::now();
        let millis = now.nanosecond() / 1_000_000 * 1_000_000;
        self.event.event_id = Uuid::new_v4();
        self.event.event_time = now.with_nanosecond(millis).unwrap_or(now);
        self.event
    }
}

/// Catalogue of governance event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    InjectSuccess,
    InjectDenied,
    PromptUsed,
    PromptDenied,
    PolicyViolation,
    A2aCall,
    GovernanceProof,
    MemoryRead,
    MemoryWritten,
    ToolInvoked,
    ToolDenied,
    ContextCaptured,
    LineageSnapshot,
    InferenceStarted,
    InferenceCompleted,
    InferenceBlocked,
    HumanOverride,
    HumanApproval,
    ClassificationChanged,
    ModelLoaded,
    ModelSwitched,
    UnverifiedBoundary,
}

impl EventType {
    /// Wire value of `event_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InjectSuccess => "INJECT_SUCCESS",
            Self::InjectDenied => "INJECT_DENIED",
            Self::PromptUsed => "PROMPT_USED",
            Self::PromptDenied => "PROMPT_DENIED",
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::A2aCall => "A2A_CALL",
            Self::GovernanceProof => "GOVERNANCE_PROOF",
            Self::MemoryRead => "MEMORY_READ",
            Self::MemoryWritten => "MEMORY_WRITTEN",
            Self::ToolInvoked => "TOOL_INVOKED",
            Self::ToolDenied => "TOOL_DENIED",
            Self::ContextCaptured => "CONTEXT_CAPTURED",
            Self::LineageSnapshot => "LINEAGE_SNAPSHOT",
            Self::InferenceStarted => "INFERENCE_STARTED",
            Self::InferenceCompleted => "INFERENCE_COMPLETED",
            Self::InferenceBlocked => "INFERENCE_BLOCKED",
            Self::HumanOverride => "HUMAN_OVERRIDE",
            Self::HumanApproval => "HUMAN_APPROVAL",
            Self::ClassificationChanged => "CLASSIFICATION_CHANGED",
            Self::ModelLoaded => "MODEL_LOADED",
            Self::ModelSwitched => "MODEL_SWITCHED",
            Self::UnverifiedBoundary => "UNVERIFIED_BOUNDARY",
        }
    }

    /// Wire value of `event_category`
    pub fn category(&self) -> &'static str {
        match self {
            Self::InjectSuccess | Self::InjectDenied => "inject",
            Self::PromptUsed | Self::PromptDenied => "audit",
            Self::PolicyViolation => "policy",
            Self::A2aCall => "a2a",
            Self::GovernanceProof => "governance-proof",
            Self::MemoryRead | Self::MemoryWritten => "memory",
            Self::ToolInvoked | Self::ToolDenied => "tool",
            Self::ContextCaptured => "context",
            Self::LineageSnapshot => "lineage",
            Self::InferenceStarted | Self::InferenceCompleted | Self::InferenceBlocked => {
                "inference"
            }
            Self::HumanOverride | Self::HumanApproval => "human",
            Self::ClassificationChanged => "classification",
            Self::ModelLoaded | Self::ModelSwitched => "model",
            Self::UnverifiedBoundary => "boundary",
        }
    }

    /// Name of the span event emitted for this type
    pub fn span_event_name(&self) -> &'static str {
        match self {
            Self::InjectSuccess => events::INJECT_SUCCESS,
            Self::InjectDenied => events::INJECT_DENIED,
            Self::PromptUsed => events::PROMPT_USED,
            Self::PromptDenied => events::PROMPT_DENIED,
            Self::PolicyViolation => events::POLICY_VIOLATION,
            Self::A2aCall => events::A2A_CALL,
            Self::GovernanceProof => events::GOVERNANCE_PROOF,
            Self::MemoryRead => events::MEMORY_READ,
            Self::MemoryWritten => events::MEMORY_WRITTEN,
            Self::ToolInvoked => events::TOOL_INVOKED,
            Self::ToolDenied => events::TOOL_DENIED,
            Self::ContextCaptured => events::CONTEXT_CAPTURED,
            Self::LineageSnapshot => events::LINEAGE_SNAPSHOT,
            Self::InferenceStarted => events::INFERENCE_STARTED,
            Self::InferenceCompleted => events::INFERENCE_COMPLETED,
            Self::InferenceBlocked => events::INFERENCE_BLOCKED,
            Self::HumanOverride => events::HUMAN_OVERRIDE,
            Self::HumanApproval => events::HUMAN_APPROVAL,
            Self::ClassificationChanged => events::CLASSIFICATION_CHANGED,
            Self::ModelLoaded => events::MODEL_LOADED,
            Self::ModelSwitched => events::MODEL_SWITCHED,
            Self::UnverifiedBoundary => events::UNVERIFIED_BOUNDARY,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ISO-8601 UTC timestamps with exactly three fractional digits.
mod millis_timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::GovernedResource;
    use crate::merkle;

    fn minimal() -> GovernanceEvent {
        GovernanceEvent::builder("INJECT_SUCCESS", "inject", "agent.test-bot", "trace-1").build()
    }

    #[test]
    fn test_defaults() {
        let event = minimal();
        assert_eq!(event.event_type, "INJECT_SUCCESS");
        assert_eq!(event.event_category, "inject");
        assert_eq!(event.agent_id, "agent.test-bot");
        assert_eq!(event.trace_id, "trace-1");
        assert_eq!(event.span_id, "");
        assert_eq!(event.parent_span_id, "");
        assert_eq!(event.policy_version, 0);
        assert_eq!(event.prompt_version, 0);
        assert_eq!(event.hash_type, "sha256");
        assert!(event.annotations.is_empty());
        assert!(!event.template_rendered);
        assert_eq!(event.sequence_number, 0);
        assert_eq!(event.event_signature, "");
        assert_eq!(event.spec_version, "0.8.0");
        assert!(event.governance_merkle_tree.is_none());
        assert_ne!(event.event_id, Uuid::nil());
        assert_eq!(event.event_id.get_version_num(), 4);
    }

    #[test]
    fn test_every_field_serialized() {
        let json = serde_json::to_value(minimal()).unwrap();
        let obj = json.as_object().unwrap();
        for field in [
            "event_id", "event_type", "event_category", "event_time", "agent_id",
            "governance_hash", "trace_id", "span_id", "parent_span_id", "trace_flags",
            "agent_name", "org_id", "org_name", "policy_id", "policy_name", "policy_version",
            "prompt_id", "prompt_name", "prompt_version", "hash_type", "data_classification",
            "template_rendered", "denial_reason", "violation_type", "severity", "source_ip",
            "request_method", "request_path", "query_hash", "previous_hash", "annotations",
            "event_signature", "signature_key_id", "sequence_number", "causality_ref",
            "spec_version",
        ] {
            assert!(obj.contains_key(field), "missing {field}");
        }
        assert!(!obj.contains_key("governance_merkle_tree"));
        assert_eq!(obj.len(), 36);
    }

    #[test]
    fn test_merkle_tree_included_when_present() {
        let resources = vec![
            GovernedResource::content("policy", "policy.a", "A").unwrap(),
            GovernedResource::content("prompt", "prompt.b", "B").unwrap(),
        ];
        let (root, tree) = merkle::build(&resources).unwrap();
        let event = GovernanceEvent::builder("GOVERNANCE_PROOF", "governance-proof", "a", "t")
            .governance_hash(root)
            .hash_type(merkle::MERKLE_HASH_TYPE)
            .merkle_tree(tree)
            .build();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["governance_merkle_tree"]["leaf_count"], 2);
        assert_eq!(event.leaf_count(), 2);
    }

    #[test]
    fn test_event_time_millisecond_format() {
        let event = minimal();
        let json = serde_json::to_value(&event).unwrap();
        let time = json["event_time"].as_str().unwrap();
        // 2026-10-18T12:34:56.789Z
        assert_eq!(time.len(), 24);
        assert!(time.ends_with('Z'));
        assert_eq!(&time[19..20], ".");
        assert_eq!(event.event_time.nanosecond() % 1_000_000, 0);
    }

    #[test]
    fn test_json_roundtrip_is_lossless() {
        let event = GovernanceEvent::builder("MEMORY_READ", "memory", "a", "t")
            .annotation("source", serde_json::json!({"k": [1, 2]}))
            .policy("policy.x", 3)
            .build();
        let json = serde_json::to_string(&event).unwrap();
        let back: GovernanceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut json = serde_json::to_value(minimal()).unwrap();
        json["injected_field"] = serde_json::Value::from("evil");
        assert!(serde_json::from_value::<GovernanceEvent>(json).is_err());
    }

    #[test]
    fn test_fresh_ids() {
        assert_ne!(minimal().event_id, minimal().event_id);
    }

    #[test]
    fn test_correlate_fills_only_missing() {
        let ctx = SpanContext {
            trace_id: "a".repeat(32),
            span_id: "b".repeat(16),
            parent_span_id: "c".repeat(16),
            trace_flags: "01".to_string(),
        };
        let event = EventBuilder::new("X", "y", "agent", "")
            .span_id("explicit")
            .correlate(&ctx)
            .build();
        assert_eq!(event.trace_id, ctx.trace_id);
        assert_eq!(event.span_id, "explicit");
        assert_eq!(event.parent_span_id, ctx.parent_span_id);
        assert_eq!(event.trace_flags, "01");
    }

    #[test]
    fn test_event_type_catalogue() {
        assert_eq!(EventType::GovernanceProof.category(), "governance-proof");
        assert_eq!(EventType::PromptUsed.category(), "audit");
        assert_eq!(EventType::InjectDenied.span_event_name(), "aigp.inject.denied");
        let event = EventBuilder::for_type(EventType::ToolDenied, "a", "t").build();
        assert_eq!(event.event_type, "TOOL_DENIED");
        assert_eq!(event.event_category, "tool");
        assert!(event.is_denial());
        assert_eq!(event.enforcement_result(), "denied");
    }
}
