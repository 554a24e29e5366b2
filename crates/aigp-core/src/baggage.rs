//! Governance context in cross-boundary baggage.
//!
//! Baggage travels in plaintext HTTP headers across trust boundaries, so
//! only an allow-list of non-sensitive keys may be written to it: policy
//! name, data classification and org id. Governance hashes, denial reasons
//! and violation types are explicitly forbidden.

use std::collections::BTreeMap;

use crate::attributes;
use crate::error::{AigpError, Result};

/// Keys that may be propagated in baggage
pub const SAFE_KEYS: [&str; 3] = [
    attributes::POLICY_NAME,
    attributes::DATA_CLASSIFICATION,
    attributes::ORG_ID,
];

/// Keys that must never be propagated in baggage
pub const FORBIDDEN_KEYS: [&str; 3] = [
    attributes::GOVERNANCE_HASH,
    attributes::DENIAL_REASON,
    attributes::VIOLATION_TYPE,
];

/// String key/value store backing a propagation context.
///
/// Implement this over the baggage of your tracing backend.
pub trait ContextStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory baggage, convertible to and from a `baggage` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baggage {
    entries: BTreeMap<String, String>,
}

impl Baggage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a W3C `baggage` header. Member properties after `;` are
    /// dropped, as are members without `=`.
    pub fn from_header(header: &str) -> Self {
        let entries = header
            .split(',')
            .filter_map(|member| {
                let member = member.split(';').next().unwrap_or_default();
                let (key, value) = member.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn to_header(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContextStore for Baggage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Allow-list enforcing view over a [`ContextStore`].
#[derive(Debug)]
pub struct AllowListedBaggage<'a, S: ContextStore> {
    store: &'a mut S,
}

impl<'a, S: ContextStore> AllowListedBaggage<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Write governance context before an agent-to-agent call. Empty
    /// values are not written.
    pub fn inject(&mut self, policy_name: &str, data_classification: &str, org_id: &str) {
        for (key, value) in [
            (attributes::POLICY_NAME, policy_name),
            (attributes::DATA_CLASSIFICATION, data_classification),
            (attributes::ORG_ID, org_id),
        ] {
            if !value.is_empty() {
                self.store.set(key, value);
            }
        }
    }

    /// Set one allow-listed key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !SAFE_KEYS.contains(&key) {
            tracing::warn!(key = %key, "Refusing to propagate key in baggage");
            return Err(AigpError::ForbiddenBaggageKey(key.to_string()));
        }
        self.store.set(key, value);
        Ok(())
    }

    /// Non-empty allow-listed values present in the store.
    pub fn extract(&self) -> BTreeMap<String, String> {
        SAFE_KEYS
            .iter()
            .filter_map(|key| {
                self.store
                    .get(key)
                    .filter(|value| !value.is_empty())
                    .map(|value| (key.to_string(), value))
            })
            .collect()
    }

    /// Remove every allow-listed key, e.g. before crossing a trust boundary.
    pub fn clear(&mut self) {
        for key in SAFE_KEYS {
            self.store.remove(key);
        }
    }
}
