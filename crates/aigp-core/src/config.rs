//! Emitter configuration: agent identity and process-constant attributes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::attributes;
use crate::error::Result;
use crate::event::SPEC_VERSION;

/// Default tracer name
pub const DEFAULT_TRACER_NAME: &str = "aigp";

/// Identity of the agent a [`GovernanceEmitter`](crate::GovernanceEmitter)
/// emits for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// AGRN agent identifier, e.g. `agent.trading-bot-v2`
    pub agent_id: String,
    pub agent_name: String,
    pub org_id: String,
    pub org_name: String,
    /// Instrumentation scope name reported to the tracing backend
    pub tracer_name: String,
    /// Stamped on every event
    pub spec_version: String,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            agent_name: String::new(),
            org_id: String::new(),
            org_name: String::new(),
            tracer_name: DEFAULT_TRACER_NAME.to_string(),
            spec_version: SPEC_VERSION.to_string(),
        }
    }
}

impl EmitterConfig {
    /// Create a new config builder
    pub fn builder(agent_id: impl Into<String>) -> EmitterConfigBuilder {
        EmitterConfigBuilder::new(agent_id)
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            agent_id: var("AIGP_AGENT_ID"),
            agent_name: var("AIGP_AGENT_NAME"),
            org_id: var("AIGP_ORG_ID"),
            org_name: var("AIGP_ORG_NAME"),
            tracer_name: std::env::var("AIGP_TRACER_NAME")
                .unwrap_or_else(|_| DEFAULT_TRACER_NAME.to_string()),
            spec_version: SPEC_VERSION.to_string(),
        }
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        Ok(toml::from_str(document)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let document = std::fs::read_to_string(path)?;
        Self::from_toml_str(&document)
    }

    /// Process-constant resource attributes.
    ///
    /// The agent id is always present; the others only when set.
    pub fn resource_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert(attributes::AGENT_ID.to_string(), self.agent_id.clone());
        for (key, value) in [
            (attributes::AGENT_NAME, &self.agent_name),
            (attributes::ORG_ID, &self.org_id),
            (attributes::ORG_NAME, &self.org_name),
        ] {
            if !value.is_empty() {
                attrs.insert(key.to_string(), value.clone());
            }
        }
        attrs
    }
}

/// Builder for EmitterConfig
pub struct EmitterConfigBuilder {
    config: EmitterConfig,
}

impl EmitterConfigBuilder {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            config: EmitterConfig {
                agent_id: agent_id.into(),
                ..EmitterConfig::default()
            },
        }
    }

    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.config.agent_name = name.into();
        self
    }

    /// Set the owning organization
    pub fn org(mut self, org_id: impl Into<String>, org_name: impl Into<String>) -> Self {
        self.config.org_id = org_id.into();
        self.config.org_name = org_name.into();
        self
    }

    pub fn tracer_name(mut self, name: impl Into<String>) -> Self {
        self.config.tracer_name = name.into();
        self
    }

    pub fn spec_version(mut self, version: impl Into<String>) -> Self {
        self.config.spec_version = version.into();
        self
    }

    /// Build the configuration
    pub fn build(self) -> EmitterConfig {
        self.config
    }
}
