//! Property tests for governance hashing and Merkle construction

use aigp_core::merkle;
use aigp_core::{governance_hash, GovernedResource};
use proptest::prelude::*;

fn resource_strategy() -> impl Strategy<Value = (String, String, String)> {
    (
        prop::sample::select(vec!["policy", "prompt", "tool", "memory", "model", "context"]),
        "[a-z]{1,8}\\.[a-z0-9-]{1,12}",
        ".{0,64}",
    )
        .prop_map(|(t, n, c)| (t.to_string(), n, c))
}

fn resources(specs: &[(String, String, String)]) -> Vec<GovernedResource> {
    specs
        .iter()
        .map(|(t, n, c)| GovernedResource::content(t.as_str(), n.as_str(), c.as_str()).unwrap())
        .collect()
}

proptest! {
    /// Hashing is a pure function of its input
    #[test]
    fn prop_hash_deterministic(content in ".*") {
        let h = governance_hash(&content);
        prop_assert_eq!(h.len(), 64);
        prop_assert_eq!(h, governance_hash(&content));
    }

    /// Distinct content yields distinct hashes
    #[test]
    fn prop_hash_distinct(a in ".{0,32}", b in ".{0,32}") {
        prop_assume!(a != b);
        prop_assert_ne!(governance_hash(&a), governance_hash(&b));
    }

    /// Same content under different resource types yields different leaves
    #[test]
    fn prop_leaf_domain_separation(name in "[a-z]{1,10}", content in ".{0,32}") {
        let policy = GovernedResource::content("policy", name.as_str(), content.as_str()).unwrap();
        let prompt = GovernedResource::content("prompt", name.as_str(), content.as_str()).unwrap();
        prop_assert_ne!(policy.leaf_hash(), prompt.leaf_hash());
        prop_assert_eq!(policy.flat_hash(), prompt.flat_hash());
    }

    /// Same content under different resource names yields different leaves
    #[test]
    fn prop_leaf_name_separation(a in "[a-z]{1,10}", b in "[a-z]{1,10}", content in ".{0,32}") {
        prop_assume!(a != b);
        let first = GovernedResource::content("tool", a.as_str(), content.as_str()).unwrap();
        let second = GovernedResource::content("tool", b.as_str(), content.as_str()).unwrap();
        prop_assert_ne!(first.leaf_hash(), second.leaf_hash());
    }

    /// The Merkle root does not depend on input order
    #[test]
    fn prop_root_permutation_invariant(
        specs in prop::collection::vec(resource_strategy(), 2..12),
        seed in any::<u64>(),
    ) {
        let (root, tree) = merkle::build(&resources(&specs)).unwrap();

        let mut shuffled = specs.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();
        let (shuffled_root, _) = merkle::build(&resources(&shuffled)).unwrap();

        prop_assert_eq!(&root, &shuffled_root);
        let tree = tree.unwrap();
        prop_assert_eq!(tree.leaf_count, specs.len());
        prop_assert!(tree.verify_root(&root));
    }

    /// Leaves in a published tree are sorted by hash
    #[test]
    fn prop_leaves_sorted(specs in prop::collection::vec(resource_strategy(), 2..12)) {
        let (_, tree) = merkle::build(&resources(&specs)).unwrap();
        let hashes: Vec<String> = tree.unwrap().leaves.into_iter().map(|l| l.hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        prop_assert_eq!(hashes, sorted);
    }

    /// Changing any one resource's content changes the root
    #[test]
    fn prop_root_binds_every_leaf(
        specs in prop::collection::vec(resource_strategy(), 2..8),
        index in any::<prop::sample::Index>(),
    ) {
        let (root, _) = merkle::build(&resources(&specs)).unwrap();

        let mut altered = specs.clone();
        let i = index.index(altered.len());
        altered[i].2.push_str("\u{0}tampered");
        let (altered_root, _) = merkle::build(&resources(&altered)).unwrap();

        prop_assert_ne!(root, altered_root);
    }
}
