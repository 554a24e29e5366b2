//! `aigp.*` semantic attribute names for span annotation.
//!
//! Lowercase, dot-separated, domain first: `aigp.{component}.{property}`.

// Resource attributes (constant per agent process)
pub const AGENT_ID: &str = "aigp.agent.id";
pub const AGENT_NAME: &str = "aigp.agent.name";
pub const ORG_ID: &str = "aigp.org.id";
pub const ORG_NAME: &str = "aigp.org.name";

// Core governance
pub const EVENT_ID: &str = "aigp.event.id";
pub const EVENT_TYPE: &str = "aigp.event.type";
pub const EVENT_CATEGORY: &str = "aigp.event.category";
pub const GOVERNANCE_HASH: &str = "aigp.governance.hash";
pub const GOVERNANCE_HASH_TYPE: &str = "aigp.governance.hash_type";
pub const DATA_CLASSIFICATION: &str = "aigp.data.classification";
pub const ENFORCEMENT_RESULT: &str = "aigp.enforcement.result";

// Policy (one policy per span)
pub const POLICY_NAME: &str = "aigp.policy.name";
pub const POLICY_VERSION: &str = "aigp.policy.version";
pub const POLICY_ID: &str = "aigp.policy.id";

// Prompt (one prompt per span)
pub const PROMPT_NAME: &str = "aigp.prompt.name";
pub const PROMPT_VERSION: &str = "aigp.prompt.version";
pub const PROMPT_ID: &str = "aigp.prompt.id";

// Array-valued, for operations governed by several resources at once
pub const POLICIES_NAMES: &str = "aigp.policies.names";
pub const POLICIES_VERSIONS: &str = "aigp.policies.versions";
pub const PROMPTS_NAMES: &str = "aigp.prompts.names";
pub const TOOLS_NAMES: &str = "aigp.tools.names";
pub const CONTEXTS_NAMES: &str = "aigp.contexts.names";
pub const LINEAGES_NAMES: &str = "aigp.lineages.names";

pub const MERKLE_LEAF_COUNT: &str = "aigp.governance.merkle.leaf_count";

// Denial and violation
pub const SEVERITY: &str = "aigp.severity";
pub const VIOLATION_TYPE: &str = "aigp.violation.type";
pub const DENIAL_REASON: &str = "aigp.denial.reason";

// Proof integrity
pub const EVENT_SIGNATURE: &str = "aigp.event.signature";
pub const SIGNATURE_KEY_ID: &str = "aigp.signature.key_id";
pub const SEQUENCE_NUMBER: &str = "aigp.sequence.number";
pub const CAUSALITY_REF: &str = "aigp.causality.ref";

/// Span event names
pub mod events {
    pub const INJECT_SUCCESS: &str = "aigp.inject.success";
    pub const INJECT_DENIED: &str = "aigp.inject.denied";
    pub const PROMPT_USED: &str = "aigp.prompt.used";
    pub const PROMPT_DENIED: &str = "aigp.prompt.denied";
    pub const POLICY_VIOLATION: &str = "aigp.policy.violation";
    pub const GOVERNANCE_PROOF: &str = "aigp.governance.proof";
    pub const A2A_CALL: &str = "aigp.a2a.call";
    pub const MEMORY_READ: &str = "aigp.memory.read";
    pub const MEMORY_WRITTEN: &str = "aigp.memory.written";
    pub const TOOL_INVOKED: &str = "aigp.tool.invoked";
    pub const TOOL_DENIED: &str = "aigp.tool.denied";
    pub const CONTEXT_CAPTURED: &str = "aigp.context.captured";
    pub const LINEAGE_SNAPSHOT: &str = "aigp.lineage.snapshot";
    pub const INFERENCE_STARTED: &str = "aigp.inference.started";
    pub const INFERENCE_COMPLETED: &str = "aigp.inference.completed";
    pub const INFERENCE_BLOCKED: &str = "aigp.inference.blocked";
    pub const HUMAN_OVERRIDE: &str = "aigp.human.override";
    pub const HUMAN_APPROVAL: &str = "aigp.human.approval";
    pub const CLASSIFICATION_CHANGED: &str = "aigp.classification.changed";
    pub const MODEL_LOADED: &str = "aigp.model.loaded";
    pub const MODEL_SWITCHED: &str = "aigp.model.switched";
    pub const UNVERIFIED_BOUNDARY: &str = "aigp.boundary.unverified";
}

pub const ENFORCEMENT_ALLOWED: &str = "allowed";
pub const ENFORCEMENT_DENIED: &str = "denied";

/// Data classification levels and their tracestate abbreviations
pub mod classification {
    pub const PUBLIC: &str = "public";
    pub const INTERNAL: &str = "internal";
    pub const CONFIDENTIAL: &str = "confidential";
    pub const RESTRICTED: &str = "restricted";

    /// Full level to three-letter abbreviation
    pub const ABBREVIATIONS: [(&str, &str); 4] = [
        (PUBLIC, "pub"),
        (INTERNAL, "int"),
        (CONFIDENTIAL, "con"),
        (RESTRICTED, "res"),
    ];

    pub fn abbreviate(level: &str) -> Option<&'static str> {
        ABBREVIATIONS
            .iter()
            .find(|(full, _)| *full == level)
            .map(|(_, abbrev)| *abbrev)
    }

    pub fn expand(abbrev: &str) -> Option<&'static str> {
        ABBREVIATIONS
            .iter()
            .find(|(_, a)| *a == abbrev)
            .map(|(full, _)| *full)
    }
}

/// Whether an event type marks a denied, violating, or blocked action.
pub fn is_denial_event_type(event_type: &str) -> bool {
    event_type.contains("DENIED") || event_type.contains("VIOLATION") || event_type.contains("BLOCKED")
}

/// `allowed` or `denied`, derived from the event type.
pub fn enforcement_result(event_type: &str) -> &'static str {
    if is_denial_event_type(event_type) {
        ENFORCEMENT_DENIED
    } else {
        ENFORCEMENT_ALLOWED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enforcement_result() {
        assert_eq!(enforcement_result("INJECT_SUCCESS"), "allowed");
        assert_eq!(enforcement_result("INJECT_DENIED"), "denied");
        assert_eq!(enforcement_result("POLICY_VIOLATION"), "denied");
        assert_eq!(enforcement_result("INFERENCE_BLOCKED"), "denied");
        assert_eq!(enforcement_result("HUMAN_OVERRIDE"), "allowed");
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classification::abbreviate("confidential"), Some("con"));
        assert_eq!(classification::expand("res"), Some("restricted"));
        assert_eq!(classification::abbreviate("secret"), None);
        assert_eq!(classification::expand("sec"), None);
    }
}
