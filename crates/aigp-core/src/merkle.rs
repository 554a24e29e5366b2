//! Merkle governance hash over a set of governed resources.
//!
//! Leaves are sorted ascending by hash before combination, so the root does
//! not depend on the order resources are supplied in. Each level pairs
//! hashes left to right as `SHA-256(left_hex || right_hex)`; an unpaired
//! last hash is promoted to the next level unchanged. It is never paired
//! with a copy of itself: duplication lets an N-leaf tree share its root
//! with an (N+1)-leaf tree whose last leaf repeats.
//!
//! This combination rule is part of the wire format of issued proofs and
//! must stay bit-for-bit stable.

use serde::{Deserialize, Serialize};

use crate::error::{AigpError, Result};
use crate::hash::{governance_hash, GovernedResource, HashMode};

/// `algorithm` tag of every tree built here
pub const MERKLE_ALGORITHM: &str = "sha256";

/// `hash_type` of events whose governance hash is a Merkle root
pub const MERKLE_HASH_TYPE: &str = "merkle-sha256";

/// `hash_type` of events whose governance hash is a flat SHA-256
pub const FLAT_HASH_TYPE: &str = "sha256";

/// One resource's entry in a published tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleLeaf {
    pub resource_type: String,
    pub resource_name: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "HashMode::is_content")]
    pub hash_mode: HashMode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_ref: String,
}

impl From<&GovernedResource> for MerkleLeaf {
    fn from(resource: &GovernedResource) -> Self {
        Self {
            resource_type: resource.resource_type().to_string(),
            resource_name: resource.resource_name().to_string(),
            hash: resource.leaf_hash(),
            hash_mode: resource.hash_mode(),
            content_ref: resource.content_ref().to_string(),
        }
    }
}

/// Serializable description of a governance Merkle tree.
///
/// `leaves` are sorted ascending by `hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    pub algorithm: String,
    pub leaf_count: usize,
    pub leaves: Vec<MerkleLeaf>,
}

impl MerkleTree {
    /// Recompute the root from the published leaves.
    ///
    /// Leaves are re-sorted first so a tree whose leaf list was reordered in
    /// transit still yields its original root.
    pub fn compute_root(&self) -> Result<String> {
        let mut hashes: Vec<String> = self.leaves.iter().map(|l| l.hash.clone()).collect();
        hashes.sort();
        merkle_root(&hashes)
    }

    /// Check that the leaves combine to `expected_root` and that
    /// `leaf_count` matches.
    pub fn verify_root(&self, expected_root: &str) -> bool {
        self.leaf_count == self.leaves.len()
            && self
                .compute_root()
                .map(|root| root == expected_root)
                .unwrap_or(false)
    }

    /// Whether `resource` is one of this tree's leaves.
    ///
    /// Lets a holder of a single resource prove it was governed without
    /// disclosing the other resources' content.
    pub fn contains_resource(&self, resource: &GovernedResource) -> bool {
        let hash = resource.leaf_hash();
        self.leaves.iter().any(|leaf| {
            leaf.hash == hash
                && leaf.resource_type == resource.resource_type()
                && leaf.resource_name == resource.resource_name()
        })
    }
}

/// Combine already-sorted leaf hashes into a root.
///
/// A single hash is its own root.
pub fn merkle_root(sorted_hashes: &[String]) -> Result<String> {
    if sorted_hashes.is_empty() {
        return Err(AigpError::EmptyResourceSet);
    }

    let mut level = sorted_hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(governance_hash(&format!("{left}{right}"))),
                // Odd node: promote without duplication
                [odd] => next.push(odd.clone()),
                _ => unreachable!("chunks(2) yields one or two elements"),
            }
        }
        level = next;
    }
    Ok(level.remove(0))
}

/// Compute the governance hash for a set of resources.
///
/// One resource yields a flat hash of its hashable content and no tree.
/// Two or more yield the Merkle root and the tree description.
pub fn build(resources: &[GovernedResource]) -> Result<(String, Option<MerkleTree>)> {
    match resources {
        [] => Err(AigpError::EmptyResourceSet),
        [single] => Ok((single.flat_hash(), None)),
        many => {
            let mut leaves: Vec<MerkleLeaf> = many.iter().map(MerkleLeaf::from).collect();
            leaves.sort_by(|a, b| a.hash.cmp(&b.hash));

            let hashes: Vec<String> = leaves.iter().map(|l| l.hash.clone()).collect();
            let root = merkle_root(&hashes)?;

            tracing::trace!(leaf_count = leaves.len(), root = %root, "Built governance Merkle tree");

            Ok((
                root,
                Some(MerkleTree {
                    algorithm: MERKLE_ALGORITHM.to_string(),
                    leaf_count: leaves.len(),
                    leaves,
                }),
            ))
        }
    }
}
