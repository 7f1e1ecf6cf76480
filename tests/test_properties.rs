//! Property-driven checks over random hit sequences
//!
//! Addresses are drawn from a deliberately narrow corner of the address
//! space so the checkpoint limits actually trigger; every property is
//! checked against whatever mix of plain leaves and aggregates falls out.

use nettally::{AddrFamily, FamilyTree, Network, Tree, TreeError};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::HashMap;

/// Hosts spread over a handful of /64, /112 and host positions under
/// 2001:db8::/48
fn v6_pool() -> impl Strategy<Value = String> {
    (0u8..4, 0u8..4, 0u8..8)
        .prop_map(|(a, b, c)| format!("2001:db8:0:{:x}::{:x}:{:x}", a, b, c))
}

/// Hosts spread over a few /24 and /30 positions under 203.0.0.0/16
fn v4_pool() -> impl Strategy<Value = String> {
    (0u8..4, 0u8..8).prop_map(|(a, b)| format!("203.0.{}.{}", a, b))
}

fn filled_v6(addrs: &[String]) -> FamilyTree<()> {
    let mut tree = FamilyTree::new(AddrFamily::V6);
    for addr in addrs {
        tree.add(addr.as_str()).unwrap();
    }
    tree
}

fn snapshot<T>(tree: &FamilyTree<T>) -> Vec<(String, u64, bool)> {
    tree.leafs()
        .map(|n| (n.network().to_string(), n.hit_count(), n.aggregated()))
        .collect()
}

proptest! {
    #[test]
    fn prop_hits_are_conserved(addrs in vec(v6_pool(), 1..120)) {
        let tree = filled_v6(&addrs);
        let total: u64 = tree.leafs().map(|n| n.hit_count()).sum();
        prop_assert_eq!(total, addrs.len() as u64);
    }

    #[test]
    fn prop_leaves_are_disjoint(addrs in vec(v6_pool(), 1..120)) {
        let tree = filled_v6(&addrs);
        let nets: Vec<Network> = tree.leafs().map(|n| n.network()).collect();
        for (i, a) in nets.iter().enumerate() {
            for (j, b) in nets.iter().enumerate() {
                if i != j {
                    prop_assert!(!a.contains(b), "{} contains {}", a, b);
                }
            }
        }
    }

    #[test]
    fn prop_checkpoint_limits_hold(addrs in vec(v6_pool(), 1..120)) {
        let tree = filled_v6(&addrs);
        for (depth, limit) in tree.prefix_limits().aggregating() {
            // leaves shallower than the checkpoint span several anchors
            // and are counted by the shallower checkpoints instead
            let mut counts: HashMap<Network, u32> = HashMap::new();
            for leaf in tree.leafs().filter(|n| n.network().prefix_len() >= depth) {
                *counts.entry(leaf.network().supernet(depth)).or_default() += 1;
            }
            for (anchor, count) in counts {
                prop_assert!(
                    count <= limit,
                    "{} leaves under {} exceed the limit of {} at depth {}",
                    count, anchor, limit, depth
                );
            }
        }
    }

    #[test]
    fn prop_aggregates_sit_on_configured_depths(addrs in vec(v6_pool(), 1..120)) {
        let tree = filled_v6(&addrs);
        for node in tree.leafs().filter(|n| n.aggregated()) {
            let depth = node.network().prefix_len();
            prop_assert!(
                tree.prefix_limits().aggregating().any(|(d, _)| d == depth),
                "aggregate {} sits at unconfigured depth {}",
                node.network(), depth
            );
        }
    }

    #[test]
    fn prop_lookup_succeeds_after_insert(addrs in vec(v6_pool(), 1..80)) {
        let mut tree: FamilyTree<()> = FamilyTree::new(AddrFamily::V6);
        for addr in &addrs {
            tree.add(addr.as_str()).unwrap();
            let host: Network = addr.parse().unwrap();
            let node = tree.get(addr.as_str()).unwrap();
            prop_assert!(node.network().contains(&host));
            prop_assert!(node.hit_count() >= 1);
        }
    }

    #[test]
    fn prop_enumeration_is_restartable(addrs in vec(v6_pool(), 0..120)) {
        let tree = filled_v6(&addrs);
        prop_assert_eq!(snapshot(&tree), snapshot(&tree));
    }

    #[test]
    fn prop_removing_every_leaf_empties_the_tree(addrs in vec(v6_pool(), 1..120)) {
        let mut tree = filled_v6(&addrs);
        let nets: Vec<Network> = tree.leafs().map(|n| n.network()).collect();
        for net in &nets {
            tree.remove(net).unwrap();
        }
        prop_assert_eq!(tree.leafs().count(), 0);
        for addr in &addrs {
            prop_assert!(matches!(
                tree.get(addr.as_str()),
                Err(TreeError::NotFound(_))
            ));
        }
    }

    #[test]
    fn prop_families_stay_isolated(
        v4_addrs in vec(v4_pool(), 1..60),
        v6_addrs in vec(v6_pool(), 1..60),
    ) {
        let mut tree: Tree<()> = Tree::new();
        for addr in &v4_addrs {
            tree.add(addr.as_str()).unwrap();
        }
        let v4_before = snapshot(tree.v4());

        for addr in &v6_addrs {
            tree.add(addr.as_str()).unwrap();
        }
        let v6_nets: Vec<Network> = tree.v6().leafs().map(|n| n.network()).collect();
        for net in &v6_nets {
            tree.remove(net).unwrap();
        }

        prop_assert_eq!(snapshot(tree.v4()), v4_before);
        prop_assert_eq!(tree.v6().leafs().count(), 0);
    }
}
