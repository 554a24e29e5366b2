//! Governance hash primitives.
//!
//! Content is hashed as its raw UTF-8 bytes. Nothing is trimmed, case-folded
//! or Unicode-normalized: two inputs hash equal only when they are
//! byte-identical, so a normalization step can never be used to make
//! different content look governed.
//!
//! Leaf hashes prefix the content with `"{resource_type}:{resource_name}:"`.
//! The prefix is a domain separator: the same bytes governed as a policy and
//! as a prompt, or under two names, produce unrelated leaves.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AigpError, Result};

/// Standard resource type tags. Any lowercase kebab-case tag is accepted.
pub mod resource_types {
    pub const POLICY: &str = "policy";
    pub const PROMPT: &str = "prompt";
    pub const TOOL: &str = "tool";
    pub const LINEAGE: &str = "lineage";
    pub const CONTEXT: &str = "context";
    pub const MEMORY: &str = "memory";
    pub const MODEL: &str = "model";
}

/// Digest algorithms accepted for flat governance hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Tag used in `hash_type` and tree `algorithm` fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the lowercase hex digest
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = AigpError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            other => Err(AigpError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Hex digest of `content` under `algorithm`.
pub fn digest(content: &[u8], algorithm: HashAlgorithm) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(content)),
        HashAlgorithm::Sha384 => hex::encode(Sha384::digest(content)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(content)),
    }
}

/// Hex digest of `content` under the algorithm named by `algorithm`.
pub fn digest_named(content: &[u8], algorithm: &str) -> Result<String> {
    Ok(digest(content, algorithm.parse()?))
}

/// SHA-256 governance hash of `content` (64 lowercase hex characters).
pub fn governance_hash(content: &str) -> String {
    digest(content.as_bytes(), HashAlgorithm::Sha256)
}

fn resource_type_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("resource type pattern is valid")
    })
}

/// Check `resource_type` against the lowercase kebab-case pattern.
pub fn validate_resource_type(resource_type: &str) -> Result<()> {
    if resource_type_pattern().is_match(resource_type) {
        Ok(())
    } else {
        Err(AigpError::InvalidResourceType(resource_type.to_string()))
    }
}

/// What part of a resource is hashed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMode {
    /// Hash the governed content inline.
    #[default]
    Content,
    /// Hash the stable URI of externally stored content.
    Pointer,
}

impl HashMode {
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Content)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Pointer => "pointer",
        }
    }
}

/// Leaf hash of one governed resource.
///
/// `SHA-256("{resource_type}:{resource_name}:{hashable}")`, where `hashable`
/// is `content` in content mode and `content_ref` in pointer mode.
pub fn leaf_hash(
    resource_type: &str,
    resource_name: &str,
    content: &str,
    hash_mode: HashMode,
    content_ref: &str,
) -> Result<String> {
    validate_resource_type(resource_type)?;
    let hashable = match hash_mode {
        HashMode::Content => content,
        HashMode::Pointer => {
            if content_ref.is_empty() {
                return Err(AigpError::MissingContentRef(resource_name.to_string()));
            }
            content_ref
        }
    };
    let prefixed = format!("{resource_type}:{resource_name}:{hashable}");
    Ok(governance_hash(&prefixed))
}

/// Governed bytes of a resource: inline content or a pointer to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceBody {
    Content(String),
    Pointer(String),
}

/// One unit of content whose presence is being attested.
///
/// Constructed through [`GovernedResource::content`] or
/// [`GovernedResource::pointer`], both of which validate eagerly so a
/// malformed resource never reaches the Merkle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovernedResource {
    resource_type: String,
    resource_name: String,
    body: ResourceBody,
}

impl GovernedResource {
    /// Resource governed by its inline content.
    pub fn content(
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self> {
        let resource_type = resource_type.into();
        validate_resource_type(&resource_type)?;
        Ok(Self {
            resource_type,
            resource_name: resource_name.into(),
            body: ResourceBody::Content(content.into()),
        })
    }

    /// Resource governed by a stable reference to external content.
    pub fn pointer(
        resource_type: impl Into<String>,
        resource_name: impl Into<String>,
        content_ref: impl Into<String>,
    ) -> Result<Self> {
        let resource_type = resource_type.into();
        let resource_name = resource_name.into();
        let content_ref = content_ref.into();
        validate_resource_type(&resource_type)?;
        if content_ref.is_empty() {
            return Err(AigpError::MissingContentRef(resource_name));
        }
        Ok(Self {
            resource_type,
            resource_name,
            body: ResourceBody::Pointer(content_ref),
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn body(&self) -> &ResourceBody {
        &self.body
    }

    pub fn hash_mode(&self) -> HashMode {
        match self.body {
            ResourceBody::Content(_) => HashMode::Content,
            ResourceBody::Pointer(_) => HashMode::Pointer,
        }
    }

    /// The string that is hashed: content, or content_ref in pointer mode.
    pub fn hashable(&self) -> &str {
        match &self.body {
            ResourceBody::Content(content) => content,
            ResourceBody::Pointer(content_ref) => content_ref,
        }
    }

    /// Content reference, empty in content mode.
    pub fn content_ref(&self) -> &str {
        match &self.body {
            ResourceBody::Content(_) => "",
            ResourceBody::Pointer(content_ref) => content_ref,
        }
    }

    /// Domain-separated leaf hash of this resource.
    pub fn leaf_hash(&self) -> String {
        let prefixed = format!(
            "{}:{}:{}",
            self.resource_type,
            self.resource_name,
            self.hashable()
        );
        governance_hash(&prefixed)
    }

    /// Flat hash of the hashable content, without domain separation.
    pub fn flat_hash(&self) -> String {
        governance_hash(self.hashable())
    }
}

/// Wire form of a governed resource, as found in resource files and
/// JSON payloads. Normalized into [`GovernedResource`] with `TryFrom`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub resource_type: String,
    pub resource_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub hash_mode: HashMode,
    #[serde(default)]
    pub content_ref: String,
}

impl TryFrom<ResourceSpec> for GovernedResource {
    type Error = AigpError;

    fn try_from(spec: ResourceSpec) -> Result<Self> {
        match spec.hash_mode {
            HashMode::Content => {
                GovernedResource::content(spec.resource_type, spec.resource_name, spec.content)
            }
            HashMode::Pointer => {
                GovernedResource::pointer(spec.resource_type, spec.resource_name, spec.content_ref)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_vector() {
        assert_eq!(
            governance_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_lengths() {
        for alg in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            let h = digest(b"governed", alg);
            assert_eq!(h.len(), alg.hex_len());
            assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = digest_named(b"x", "md5").unwrap_err();
        assert!(matches!(err, AigpError::UnsupportedAlgorithm(ref a) if a == "md5"));
        assert!("SHA256".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_no_normalization() {
        let base = governance_hash("Max position: $10M");
        assert_ne!(base, governance_hash("Max position: $10M "));
        assert_ne!(base, governance_hash(" Max position: $10M"));
        assert_ne!(base, governance_hash("max position: $10m"));
        assert_ne!(base, governance_hash("Max position: $10M\n"));
        assert_ne!(base, governance_hash("Max position: $10M\r\n"));
        // Precomposed vs. decomposed e-acute
        assert_ne!(governance_hash("caf\u{e9}"), governance_hash("cafe\u{301}"));
    }

    #[test]
    fn test_resource_type_pattern() {
        for ok in ["policy", "prompt", "compliance", "human-approval", "a1", "x-2-y"] {
            assert!(validate_resource_type(ok).is_ok(), "{ok}");
        }
        for bad in ["", "Policy", "1policy", "policy_x", "-policy", "policy-", "a--b", "po licy"] {
            assert!(
                matches!(validate_resource_type(bad), Err(AigpError::InvalidResourceType(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_leaf_hash_format() {
        let leaf = leaf_hash("policy", "policy.a", "A", HashMode::Content, "").unwrap();
        assert_eq!(leaf, governance_hash("policy:policy.a:A"));
    }

    #[test]
    fn test_leaf_hash_domain_separation() {
        let as_policy = leaf_hash("policy", "x", "same", HashMode::Content, "").unwrap();
        let as_prompt = leaf_hash("prompt", "x", "same", HashMode::Content, "").unwrap();
        let other_name = leaf_hash("policy", "y", "same", HashMode::Content, "").unwrap();
        assert_ne!(as_policy, as_prompt);
        assert_ne!(as_policy, other_name);
        assert_ne!(as_policy, governance_hash("same"));
    }

    #[test]
    fn test_pointer_leaf_hashes_content_ref() {
        let uri = "s3://aigp-governance/sha256:abc123";
        let leaf = leaf_hash("memory", "memory.history", "ignored", HashMode::Pointer, uri).unwrap();
        assert_eq!(leaf, governance_hash(&format!("memory:memory.history:{uri}")));
    }

    #[test]
    fn test_pointer_requires_content_ref() {
        let err = leaf_hash("memory", "m", "", HashMode::Pointer, "").unwrap_err();
        assert!(matches!(err, AigpError::MissingContentRef(_)));
        assert!(matches!(
            GovernedResource::pointer("memory", "m", ""),
            Err(AigpError::MissingContentRef(_))
        ));
    }

    #[test]
    fn test_invalid_type_rejected_at_construction() {
        assert!(matches!(
            GovernedResource::content("Policy", "p", "c"),
            Err(AigpError::InvalidResourceType(_))
        ));
        assert!(matches!(
            leaf_hash("BAD", "p", "c", HashMode::Content, ""),
            Err(AigpError::InvalidResourceType(_))
        ));
    }

    #[test]
    fn test_resource_leaf_matches_free_function() {
        let r = GovernedResource::pointer("model", "model.v2", "hf://org/model@rev").unwrap();
        assert_eq!(
            r.leaf_hash(),
            leaf_hash("model", "model.v2", "", HashMode::Pointer, "hf://org/model@rev").unwrap()
        );
        assert_eq!(r.hash_mode(), HashMode::Pointer);
        assert_eq!(r.flat_hash(), governance_hash("hf://org/model@rev"));
    }

    #[test]
    fn test_resource_spec_normalization() {
        let spec: ResourceSpec = serde_json::from_value(serde_json::json!({
            "resource_type": "memory",
            "resource_name": "memory.vectors",
            "hash_mode": "pointer",
            "content_ref": "s3://bucket/blob"
        }))
        .unwrap();
        let resource = GovernedResource::try_from(spec).unwrap();
        assert_eq!(resource.content_ref(), "s3://bucket/blob");

        let spec: ResourceSpec = serde_json::from_value(serde_json::json!({
            "resource_type": "policy",
            "resource_name": "policy.a",
            "content": "A"
        }))
        .unwrap();
        let resource = GovernedResource::try_from(spec).unwrap();
        assert_eq!(resource.hash_mode(), HashMode::Content);
        assert_eq!(resource.hashable(), "A");
    }
}
