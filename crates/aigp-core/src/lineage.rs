//! OpenLineage facets built from governance events.
//!
//! Two custom facets are produced as plain serializable records, with no
//! OpenLineage client dependency:
//!
//! - `aigp_governance`, a run facet holding the aggregate proof
//! - `aigp_resource`, an input dataset facet per governed resource
//!
//! Lineage is passive and eventually consistent. Emit at most one run event
//! per governance session, keyed by trace id; it must never drive
//! enforcement.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{GovernanceEvent, SPEC_VERSION};
use crate::hash::resource_types;

pub const PRODUCER: &str = "https://github.com/sandarb-ai/aigp";

pub const RUN_FACET_SCHEMA_URL: &str = "https://github.com/sandarb-ai/aigp/blob/v0.8.0/integrations/openlineage/facets/AIGPGovernanceRunFacet.json";

pub const RESOURCE_FACET_SCHEMA_URL: &str = "https://github.com/sandarb-ai/aigp/blob/v0.8.0/integrations/openlineage/facets/AIGPResourceInputFacet.json";

pub const OPENLINEAGE_SCHEMA_URL: &str = "https://openlineage.io/spec/2-0-2/OpenLineage.json#/$defs/RunEvent";

/// Key of the run facet in `run.facets`
pub const RUN_FACET_KEY: &str = "aigp_governance";

/// Key of the resource facet in `inputs[].inputFacets`
pub const RESOURCE_FACET_KEY: &str = "aigp_resource";

/// `AIGPGovernanceRunFacet`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceRunFacet {
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
    pub governance_hash: String,
    pub hash_type: String,
    pub leaf_count: usize,
    pub agent_id: String,
    pub trace_id: String,
    pub spec_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,
}

impl GovernanceRunFacet {
    pub fn from_event(event: &GovernanceEvent) -> Self {
        Self {
            producer: PRODUCER.to_string(),
            schema_url: RUN_FACET_SCHEMA_URL.to_string(),
            governance_hash: event.governance_hash.clone(),
            hash_type: event.hash_type.clone(),
            leaf_count: event.leaf_count(),
            agent_id: event.agent_id.clone(),
            trace_id: event.trace_id.clone(),
            spec_version: SPEC_VERSION.to_string(),
            enforcement_result: (!event.event_type.is_empty())
                .then(|| event.enforcement_result().to_string()),
            data_classification: non_empty(&event.data_classification),
        }
    }
}

/// `AIGPResourceInputFacet`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInputFacet {
    #[serde(rename = "_producer")]
    pub producer: String,
    #[serde(rename = "_schemaURL")]
    pub schema_url: String,
    pub resource_type: String,
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_hash: Option<String>,
}

impl ResourceInputFacet {
    fn new(resource_type: &str, resource_name: &str) -> Self {
        Self {
            producer: PRODUCER.to_string(),
            schema_url: RESOURCE_FACET_SCHEMA_URL.to_string(),
            resource_type: resource_type.to_string(),
            resource_name: resource_name.to_string(),
            resource_version: None,
            leaf_hash: None,
        }
    }

    /// One facet per Merkle leaf, or a single facet inferred from the
    /// event's policy (then prompt). Empty when neither is named.
    pub fn from_event(event: &GovernanceEvent) -> Vec<Self> {
        if let Some(tree) = &event.governance_merkle_tree {
            return tree
                .leaves
                .iter()
                .map(|leaf| Self {
                    leaf_hash: Some(leaf.hash.clone()),
                    ..Self::new(&leaf.resource_type, &leaf.resource_name)
                })
                .collect();
        }

        let mut facet = if !event.policy_name.is_empty() {
            let mut f = Self::new(resource_types::POLICY, &event.policy_name);
            f.resource_version = (event.policy_version > 0).then_some(event.policy_version);
            f
        } else if !event.prompt_name.is_empty() {
            let mut f = Self::new(resource_types::PROMPT, &event.prompt_name);
            f.resource_version = (event.prompt_version > 0).then_some(event.prompt_version);
            f
        } else {
            return Vec::new();
        };
        facet.leaf_hash = non_empty(&event.governance_hash);
        vec![facet]
    }
}

/// Lifecycle state of an OpenLineage run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunEventType {
    Start,
    Running,
    #[default]
    Complete,
    Fail,
    Abort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFacets {
    pub aigp_governance: GovernanceRunFacet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: String,
    pub facets: RunFacets,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFacets {
    pub aigp_resource: ResourceInputFacet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDataset {
    pub namespace: String,
    pub name: String,
    pub input_facets: InputFacets,
}

/// OpenLineage `RunEvent` carrying the governance facets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: RunEventType,
    pub event_time: String,
    pub run: Run,
    pub job: Job,
    pub inputs: Vec<InputDataset>,
    pub outputs: Vec<serde_json::Value>,
    pub producer: String,
    #[serde(rename = "schemaURL")]
    pub schema_url: String,
}

impl RunEvent {
    /// Wrap an event's facets in a run event.
    ///
    /// `run_id` defaults to the event's trace id, then to a fresh UUID.
    /// Governed resources become input datasets in `job_namespace`.
    pub fn from_event(
        event: &GovernanceEvent,
        job_namespace: &str,
        job_name: &str,
        run_id: Option<&str>,
        event_type: RunEventType,
    ) -> Self {
        let run_id = run_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| non_empty(&event.trace_id))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let inputs = ResourceInputFacet::from_event(event)
            .into_iter()
            .map(|facet| InputDataset {
                namespace: job_namespace.to_string(),
                name: facet.resource_name.clone(),
                input_facets: InputFacets { aigp_resource: facet },
            })
            .collect();

        Self {
            event_type,
            event_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            run: Run {
                run_id,
                facets: RunFacets {
                    aigp_governance: GovernanceRunFacet::from_event(event),
                },
            },
            job: Job {
                namespace: job_namespace.to_string(),
                name: job_name.to_string(),
            },
            inputs,
            outputs: Vec::new(),
            producer: PRODUCER.to_string(),
            schema_url: OPENLINEAGE_SCHEMA_URL.to_string(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventBuilder;
    use crate::hash::{governance_hash, GovernedResource};
    use crate::merkle::{self, MERKLE_HASH_TYPE};

    fn policy_event() -> GovernanceEvent {
        EventBuilder::new("INJECT_SUCCESS", "inject", "agent.bot", "a".repeat(32))
            .governance_hash(governance_hash("policy"))
            .policy("policy.limits", 4)
            .data_classification("confidential")
            .build()
    }

    fn merkle_event() -> GovernanceEvent {
        let resources = vec![
            GovernedResource::content("policy", "policy.a", "A").unwrap(),
            GovernedResource::content("prompt", "prompt.b", "B").unwrap(),
            GovernedResource::content("tool", "tool.c", "C").unwrap(),
        ];
        let (root, tree) = merkle::build(&resources).unwrap();
        EventBuilder::new("GOVERNANCE_PROOF", "governance-proof", "agent.bot", "")
            .governance_hash(root)
            .hash_type(MERKLE_HASH_TYPE)
            .merkle_tree(tree)
            .build()
    }

    #[test]
    fn test_run_facet_wire_shape() {
        let json = serde_json::to_value(GovernanceRunFacet::from_event(&policy_event())).unwrap();
        assert_eq!(json["_producer"], PRODUCER);
        assert_eq!(json["_schemaURL"], RUN_FACET_SCHEMA_URL);
        assert_eq!(json["hashType"], "sha256");
        assert_eq!(json["leafCount"], 1);
        assert_eq!(json["agentId"], "agent.bot");
        assert_eq!(json["specVersion"], "0.8.0");
        assert_eq!(json["enforcementResult"], "allowed");
        assert_eq!(json["dataClassification"], "confidential");
    }

    #[test]
    fn test_run_facet_denied_and_optional_fields() {
        let event = EventBuilder::new("TOOL_DENIED", "tool", "a", "t").build();
        let json = serde_json::to_value(GovernanceRunFacet::from_event(&event)).unwrap();
        assert_eq!(json["enforcementResult"], "denied");
        assert!(json.get("dataClassification").is_none());

        let untyped = EventBuilder::new("", "", "a", "t").build();
        assert!(GovernanceRunFacet::from_event(&untyped).enforcement_result.is_none());
    }

    #[test]
    fn test_input_facets_from_merkle_leaves() {
        let event = merkle_event();
        let facets = ResourceInputFacet::from_event(&event);
        assert_eq!(facets.len(), 3);
        let tree = event.governance_merkle_tree.as_ref().unwrap();
        for (facet, leaf) in facets.iter().zip(&tree.leaves) {
            assert_eq!(facet.resource_name, leaf.resource_name);
            assert_eq!(facet.leaf_hash.as_deref(), Some(leaf.hash.as_str()));
            assert!(facet.resource_version.is_none());
        }
        assert_eq!(GovernanceRunFacet::from_event(&event).leaf_count, 3);
    }

    #[test]
    fn test_input_facet_inferred_from_policy_then_prompt() {
        let facets = ResourceInputFacet::from_event(&policy_event());
        assert_eq!(facets.len(), 1);
        assert_eq!(facets[0].resource_type, "policy");
        assert_eq!(facets[0].resource_version, Some(4));
        assert_eq!(facets[0].leaf_hash, Some(governance_hash("policy")));

        let prompt = EventBuilder::new("PROMPT_USED", "audit", "a", "t")
            .prompt("prompt.greet", 0)
            .build();
        let facets = ResourceInputFacet::from_event(&prompt);
        assert_eq!(facets[0].resource_type, "prompt");
        assert!(facets[0].resource_version.is_none());
        assert!(facets[0].leaf_hash.is_none());

        let bare = EventBuilder::new("A2A_CALL", "a2a", "a", "t").build();
        assert!(ResourceInputFacet::from_event(&bare).is_empty());
    }

    #[test]
    fn test_run_event() {
        let event = policy_event();
        let run = RunEvent::from_event(&event, "finco.trading", "bot.invoke", None, RunEventType::default());
        assert_eq!(run.run.run_id, event.trace_id);

        let json = serde_json::to_value(&run).unwrap();
        assert_eq!(json["eventType"], "COMPLETE");
        assert_eq!(json["job"]["namespace"], "finco.trading");
        assert_eq!(json["inputs"][0]["name"], "policy.limits");
        assert_eq!(json["inputs"][0]["inputFacets"]["aigp_resource"]["resourceType"], "policy");
        assert_eq!(json["run"]["facets"]["aigp_governance"]["governanceHash"], event.governance_hash);
        assert_eq!(json["outputs"], serde_json::json!([]));
        assert_eq!(json["schemaURL"], OPENLINEAGE_SCHEMA_URL);
        assert_eq!(json["eventTime"].as_str().unwrap().len(), 24);
    }

    #[test]
    fn test_run_id_fallbacks() {
        let event = merkle_event();
        let explicit = RunEvent::from_event(&event, "ns", "job", Some("run-1"), RunEventType::Start);
        assert_eq!(explicit.run.run_id, "run-1");

        let generated = RunEvent::from_event(&event, "ns", "job", None, RunEventType::Start);
        assert!(Uuid::parse_str(&generated.run.run_id).is_ok());
    }
}
