//! One emission method per governance event type.
//!
//! Hashing rules: governed content becomes `governance_hash`, a memory
//! query becomes `query_hash`, and replaced content becomes
//! `previous_hash`. Where content is optional, an empty string means no
//! hash at all rather than the hash of the empty string.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{EmitOptions, GovernanceEmitter};
use crate::attributes;
use crate::error::{AigpError, Result};
use crate::event::{EventBuilder, EventType, GovernanceEvent};
use crate::hash::{governance_hash, resource_types, GovernedResource};
use crate::merkle::{self, FLAT_HASH_TYPE, MERKLE_HASH_TYPE};

const DEFAULT_DENIAL_SEVERITY: &str = "medium";
const DEFAULT_BLOCK_SEVERITY: &str = "high";
const DEFAULT_VIOLATION_TYPE: &str = "ACCESS_CONTROL";
const DEFAULT_A2A_METHOD: &str = "A2A";

/// A named, versioned policy or prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRef {
    pub name: String,
    #[serde(default)]
    pub version: u32,
}

impl PolicyRef {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

fn optional_hash(content: &str) -> String {
    if content.is_empty() {
        String::new()
    } else {
        governance_hash(content)
    }
}

fn denial(
    builder: EventBuilder,
    opts: &EmitOptions,
    reason: &str,
    default_severity: &str,
    default_violation: &str,
) -> EventBuilder {
    let severity = opts.severity.as_deref().unwrap_or(default_severity);
    let violation = opts.violation_type.as_deref().unwrap_or(default_violation);
    builder
        .denial_reason(reason)
        .severity(severity)
        .violation_type(violation)
}

impl GovernanceEmitter {
    fn emit(
        &self,
        event_type: EventType,
        opts: &EmitOptions,
        fill: impl FnOnce(EventBuilder) -> EventBuilder,
    ) -> GovernanceEvent {
        let (builder, span) = self.event_builder(event_type, opts);
        self.dispatch(event_type, fill(builder), span, &opts.causality_ref)
    }

    fn emit_named(
        &self,
        event_type: EventType,
        opts: &EmitOptions,
        names_attribute: &'static str,
        name: &str,
        fill: impl FnOnce(EventBuilder) -> EventBuilder,
    ) -> GovernanceEvent {
        let (builder, span) = self.event_builder(event_type, opts);
        let name = name.to_string();
        self.dispatch_with(event_type, fill(builder), span, &opts.causality_ref, |attrs| {
            attrs.insert(names_attribute.to_string(), json!([name]));
        })
    }

    /// A policy was delivered to the agent.
    pub fn inject_success(
        &self,
        policy_name: &str,
        policy_version: u32,
        content: &str,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        self.emit(EventType::InjectSuccess, &opts, |b| {
            b.governance_hash(governance_hash(content))
                .policy(policy_name, policy_version)
        })
    }

    /// Policy delivery was refused. Severity defaults to `medium`, violation
    /// type to `ACCESS_CONTROL`.
    pub fn inject_denied(&self, policy_name: &str, denial_reason: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::InjectDenied, &opts, |b| {
            let b = b.policy(policy_name, 0);
            denial(b, &opts, denial_reason, DEFAULT_DENIAL_SEVERITY, DEFAULT_VIOLATION_TYPE)
        })
    }

    pub fn prompt_used(
        &self,
        prompt_name: &str,
        prompt_version: u32,
        content: &str,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        self.emit(EventType::PromptUsed, &opts, |b| {
            b.governance_hash(governance_hash(content))
                .prompt(prompt_name, prompt_version)
        })
    }

    pub fn prompt_denied(&self, prompt_name: &str, denial_reason: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::PromptDenied, &opts, |b| {
            let b = b.prompt(prompt_name, 0);
            denial(b, &opts, denial_reason, DEFAULT_DENIAL_SEVERITY, DEFAULT_VIOLATION_TYPE)
        })
    }

    /// A policy was violated. The offending `content` is hashed when given;
    /// name the policy through [`EmitOptions::policy`].
    pub fn policy_violation(
        &self,
        violation_type: &str,
        severity: &str,
        denial_reason: &str,
        content: &str,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        self.emit(EventType::PolicyViolation, &opts, |b| {
            b.governance_hash(optional_hash(content))
                .violation_type(violation_type)
                .severity(severity)
                .denial_reason(denial_reason)
        })
    }

    /// An agent-to-agent call. The request method defaults to `A2A`.
    pub fn a2a_call(&self, request_path: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        let method = opts
            .request_method
            .clone()
            .unwrap_or_else(|| DEFAULT_A2A_METHOD.to_string());
        self.emit(EventType::A2aCall, &opts, |b| {
            b.governance_hash(optional_hash(content))
                .request(method, request_path)
        })
    }

    /// Proof that `content` was present. Name the governing policy or
    /// prompt through [`EmitOptions`].
    pub fn governance_proof(&self, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::GovernanceProof, &opts, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    /// Several policies governed one injection.
    ///
    /// With more than one entry in `resource_contents` the hash is their
    /// Merkle root; otherwise it is the flat hash of `content`. The first
    /// policy fills the singular policy fields, all of them are listed in
    /// the `all_policies` annotation, and the span carries
    /// `aigp.policies.names`/`aigp.policies.versions` instead of the
    /// singular attributes.
    pub fn multi_policy_inject(
        &self,
        policies: &[PolicyRef],
        content: &str,
        resource_contents: &[GovernedResource],
        opts: EmitOptions,
    ) -> Result<GovernanceEvent> {
        let primary = policies.first().ok_or(AigpError::EmptyPolicySet)?;

        let (hash, tree) = if resource_contents.len() > 1 {
            merkle::build(resource_contents)?
        } else {
            (governance_hash(content), None)
        };
        let hash_type = if tree.is_some() { MERKLE_HASH_TYPE } else { FLAT_HASH_TYPE };

        let all_policies: Vec<Value> = policies
            .iter()
            .map(|p| json!({"name": p.name, "version": p.version}))
            .collect();
        let names: Vec<&str> = policies.iter().map(|p| p.name.as_str()).collect();
        let versions: Vec<u32> = policies.iter().map(|p| p.version).collect();

        let (builder, span) = self.event_builder(EventType::InjectSuccess, &opts);
        let builder = builder
            .governance_hash(hash)
            .hash_type(hash_type)
            .merkle_tree(tree)
            .policy(primary.name.as_str(), primary.version)
            .annotation("all_policies", Value::Array(all_policies));

        Ok(self.dispatch_with(EventType::InjectSuccess, builder, span, &opts.causality_ref, |attrs| {
            attrs.remove(attributes::POLICY_NAME);
            attrs.remove(attributes::POLICY_VERSION);
            attrs.insert(attributes::POLICIES_NAMES.to_string(), json!(names));
            attrs.insert(attributes::POLICIES_VERSIONS.to_string(), json!(versions));
        }))
    }

    /// Proof over several governed resources at once.
    ///
    /// Two or more resources yield a Merkle root and tree; one yields a
    /// flat hash. The first resource names the policy or prompt when it is
    /// one, and every resource is listed in the `all_resources` annotation.
    pub fn multi_resource_governance_proof(
        &self,
        resources: &[GovernedResource],
        opts: EmitOptions,
    ) -> Result<GovernanceEvent> {
        let (hash, tree) = merkle::build(resources)?;
        let hash_type = if tree.is_some() { MERKLE_HASH_TYPE } else { FLAT_HASH_TYPE };
        let primary = resources.first().ok_or(AigpError::EmptyResourceSet)?;

        let all_resources: Vec<Value> = resources
            .iter()
            .map(|r| json!({"type": r.resource_type(), "name": r.resource_name()}))
            .collect();

        let (builder, span) = self.event_builder(EventType::GovernanceProof, &opts);
        let mut builder = builder
            .governance_hash(hash)
            .hash_type(hash_type)
            .merkle_tree(tree)
            .annotation("all_resources", Value::Array(all_resources));
        match primary.resource_type() {
            resource_types::POLICY => builder = builder.policy(primary.resource_name(), 0),
            resource_types::PROMPT => builder = builder.prompt(primary.resource_name(), 0),
            _ => {}
        }

        let names_by_attribute = [
            (attributes::POLICIES_NAMES, resource_types::POLICY),
            (attributes::PROMPTS_NAMES, resource_types::PROMPT),
            (attributes::TOOLS_NAMES, resource_types::TOOL),
            (attributes::CONTEXTS_NAMES, resource_types::CONTEXT),
            (attributes::LINEAGES_NAMES, resource_types::LINEAGE),
        ]
        .map(|(attribute, resource_type)| {
            let names: Vec<&str> = resources
                .iter()
                .filter(|r| r.resource_type() == resource_type)
                .map(|r| r.resource_name())
                .collect();
            (attribute, names)
        });

        Ok(self.dispatch_with(EventType::GovernanceProof, builder, span, &opts.causality_ref, |attrs| {
            for (attribute, names) in names_by_attribute {
                if !names.is_empty() {
                    attrs.insert(attribute.to_string(), json!(names));
                }
            }
        }))
    }

    /// Memory was read: `query` becomes `query_hash`, `content` the
    /// governance hash.
    pub fn memory_read(&self, memory_name: &str, query: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        tracing::trace!(memory = %memory_name, "Governed memory read");
        self.emit(EventType::MemoryRead, &opts, |b| {
            b.governance_hash(governance_hash(content))
                .query_hash(governance_hash(query))
        })
    }

    /// Memory was written; `previous_content`, if any, becomes
    /// `previous_hash`.
    pub fn memory_written(
        &self,
        memory_name: &str,
        content: &str,
        previous_content: Option<&str>,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        tracing::trace!(memory = %memory_name, "Governed memory write");
        self.emit(EventType::MemoryWritten, &opts, |b| {
            b.governance_hash(governance_hash(content))
                .previous_hash(optional_hash(previous_content.unwrap_or_default()))
        })
    }

    /// A tool was invoked; `content` is hashed when given.
    pub fn tool_invoked(&self, tool_name: &str, tool_version: u32, content: &str, opts: EmitOptions) -> GovernanceEvent {
        tracing::trace!(tool = %tool_name, tool_version, "Governed tool invocation");
        self.emit_named(EventType::ToolInvoked, &opts, attributes::TOOLS_NAMES, tool_name, |b| {
            b.governance_hash(optional_hash(content))
        })
    }

    pub fn tool_denied(&self, tool_name: &str, denial_reason: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit_named(EventType::ToolDenied, &opts, attributes::TOOLS_NAMES, tool_name, |b| {
            denial(b, &opts, denial_reason, DEFAULT_DENIAL_SEVERITY, DEFAULT_VIOLATION_TYPE)
        })
    }

    pub fn context_captured(&self, context_name: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit_named(EventType::ContextCaptured, &opts, attributes::CONTEXTS_NAMES, context_name, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    pub fn lineage_snapshot(&self, lineage_name: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit_named(EventType::LineageSnapshot, &opts, attributes::LINEAGES_NAMES, lineage_name, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    pub fn inference_started(&self, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::InferenceStarted, &opts, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    pub fn inference_completed(&self, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::InferenceCompleted, &opts, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    /// Inference was blocked. Severity defaults to `high`, so the span is
    /// marked failed unless a lower severity is given.
    pub fn inference_blocked(&self, denial_reason: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::InferenceBlocked, &opts, |b| {
            denial(b, &opts, denial_reason, DEFAULT_BLOCK_SEVERITY, "")
        })
    }

    /// A human overrode a decision; `reason` is recorded as the denial
    /// reason.
    pub fn human_override(&self, reason: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::HumanOverride, &opts, |b| b.denial_reason(reason))
    }

    pub fn human_approval(&self, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::HumanApproval, &opts, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    /// Data was reclassified. The previous level, when known, is kept in
    /// the `previous_classification` annotation.
    pub fn classification_changed(
        &self,
        new_classification: &str,
        previous_classification: &str,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        self.emit(EventType::ClassificationChanged, &opts, |b| {
            let b = b.data_classification(new_classification);
            if previous_classification.is_empty() {
                b
            } else {
                b.annotation("previous_classification", Value::from(previous_classification))
            }
        })
    }

    pub fn model_loaded(&self, model_name: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        tracing::trace!(model = %model_name, "Governed model load");
        self.emit(EventType::ModelLoaded, &opts, |b| {
            b.governance_hash(governance_hash(content))
        })
    }

    pub fn model_switched(
        &self,
        model_name: &str,
        content: &str,
        previous_content: Option<&str>,
        opts: EmitOptions,
    ) -> GovernanceEvent {
        tracing::trace!(model = %model_name, "Governed model switch");
        self.emit(EventType::ModelSwitched, &opts, |b| {
            b.governance_hash(governance_hash(content))
                .previous_hash(optional_hash(previous_content.unwrap_or_default()))
        })
    }

    /// Interaction with an ungoverned or unverifiable agent. The target is
    /// recorded in the `target_agent_id` annotation.
    pub fn unverified_boundary(&self, target_agent_id: &str, content: &str, opts: EmitOptions) -> GovernanceEvent {
        self.emit(EventType::UnverifiedBoundary, &opts, |b| {
            b.governance_hash(optional_hash(content))
                .annotation("target_agent_id", Value::from(target_agent_id))
        })
    }
}
