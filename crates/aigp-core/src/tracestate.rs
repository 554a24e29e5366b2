//! `aigp` vendor entry in the W3C `tracestate` header.
//!
//! Value format: `cls:{abbrev};pol:{policy_name};ver:{policy_version}`.
//! Unlike baggage, tracestate is preserved by every compliant proxy, so it
//! carries the minimum governance signal: classification, policy name and
//! version. Nothing sensitive goes here.

use serde::{Deserialize, Serialize};

use crate::attributes::classification;

/// Vendor key of the `aigp` entry
pub const VENDOR_KEY: &str = "aigp";

const ENTRY_PREFIX: &str = "aigp=";

/// Governance context carried in tracestate.
///
/// Decoded values are kept as strings; `policy_version` in particular is
/// not parsed, so a peer's malformed version survives a decode untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceTraceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_classification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
}

impl GovernanceTraceState {
    pub fn is_empty(&self) -> bool {
        self.data_classification.is_none() && self.policy_name.is_none() && self.policy_version.is_none()
    }
}

/// Encode governance context as an `aigp` vendor value.
///
/// Empty components are omitted, as is a version of 0. Classifications
/// outside the standard four are shortened to their first three characters.
pub fn encode(data_classification: &str, policy_name: &str, policy_version: u32) -> String {
    let mut parts = Vec::with_capacity(3);
    if !data_classification.is_empty() {
        let abbrev = match classification::abbreviate(data_classification) {
            Some(abbrev) => abbrev.to_string(),
            None => data_classification.chars().take(3).collect(),
        };
        parts.push(format!("cls:{abbrev}"));
    }
    if !policy_name.is_empty() {
        parts.push(format!("pol:{policy_name}"));
    }
    if policy_version > 0 {
        parts.push(format!("ver:{policy_version}"));
    }
    parts.join(";")
}

/// Decode an `aigp` vendor value. Unknown keys and parts without a `:` are
/// skipped; unknown classification abbreviations are kept as-is.
pub fn decode(vendor_value: &str) -> GovernanceTraceState {
    let mut state = GovernanceTraceState::default();
    for part in vendor_value.split(';') {
        let Some((key, value)) = part.split_once(':') else {
            continue;
        };
        match key {
            "cls" => {
                let full = classification::expand(value).unwrap_or(value);
                state.data_classification = Some(full.to_string());
            }
            "pol" => state.policy_name = Some(value.to_string()),
            "ver" => state.policy_version = Some(value.to_string()),
            _ => {}
        }
    }
    state
}

/// Put the `aigp` entry at the front of an existing tracestate header.
///
/// Any earlier `aigp` entry is dropped first. When there is nothing to
/// encode the header is returned unchanged.
pub fn inject(
    existing: &str,
    data_classification: &str,
    policy_name: &str,
    policy_version: u32,
) -> String {
    let value = encode(data_classification, policy_name, policy_version);
    if value.is_empty() {
        return existing.to_string();
    }

    let mut entries = vec![format!("{ENTRY_PREFIX}{value}")];
    entries.extend(
        existing
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty() && !entry.starts_with(ENTRY_PREFIX))
            .map(str::to_string),
    );
    entries.join(",")
}

/// Decode the first `aigp` entry of a tracestate header, or an empty state.
pub fn extract(tracestate: &str) -> GovernanceTraceState {
    tracestate
        .split(',')
        .map(str::trim)
        .find_map(|entry| entry.strip_prefix(ENTRY_PREFIX))
        .map(decode)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_full() {
        assert_eq!(
            encode("confidential", "policy.trading-limits", 4),
            "cls:con;pol:policy.trading-limits;ver:4"
        );
    }

    #[test]
    fn test_encode_omits_empty_parts() {
        assert_eq!(encode("", "policy.x", 0), "pol:policy.x");
        assert_eq!(encode("public", "", 0), "cls:pub");
        assert_eq!(encode("", "", 2), "ver:2");
        assert_eq!(encode("", "", 0), "");
    }

    #[test]
    fn test_encode_unknown_classification_truncated() {
        assert_eq!(encode("secret", "", 0), "cls:sec");
        assert_eq!(encode("ab", "", 0), "cls:ab");
    }

    #[test]
    fn test_decode() {
        let state = decode("cls:res;pol:policy.y;ver:12");
        assert_eq!(state.data_classification.as_deref(), Some("restricted"));
        assert_eq!(state.policy_name.as_deref(), Some("policy.y"));
        assert_eq!(state.policy_version.as_deref(), Some("12"));
    }

    #[test]
    fn test_decode_keeps_unknown_abbreviation_and_skips_junk() {
        let state = decode("cls:sec;garbage;zzz:1;pol:a:b");
        assert_eq!(state.data_classification.as_deref(), Some("sec"));
        assert_eq!(state.policy_name.as_deref(), Some("a:b"));
        assert!(state.policy_version.is_none());
    }

    #[test]
    fn test_inject_prepends_and_replaces() {
        let header = inject("dd=s:1", "confidential", "policy.x", 4);
        assert_eq!(header, "aigp=cls:con;pol:policy.x;ver:4,dd=s:1");

        let replaced = inject(&header, "internal", "", 0);
        assert_eq!(replaced, "aigp=cls:int,dd=s:1");
    }

    #[test]
    fn test_inject_into_empty_and_noop() {
        assert_eq!(inject("", "public", "", 0), "aigp=cls:pub");
        assert_eq!(inject("aigp=cls:con", "public", "", 0), "aigp=cls:pub");
        assert_eq!(inject("dd=s:1, ot=p:8", "", "", 0), "dd=s:1, ot=p:8");
        assert_eq!(inject("dd=s:1, ot=p:8", "public", "", 0), "aigp=cls:pub,dd=s:1,ot=p:8");
    }

    #[test]
    fn test_extract() {
        let state = extract("dd=s:1, aigp=cls:con;pol:policy.x;ver:4");
        assert_eq!(
            state,
            GovernanceTraceState {
                data_classification: Some("confidential".to_string()),
                policy_name: Some("policy.x".to_string()),
                policy_version: Some("4".to_string()),
            }
        );
        assert!(extract("dd=s:1").is_empty());
        assert!(extract("").is_empty());
    }
}
