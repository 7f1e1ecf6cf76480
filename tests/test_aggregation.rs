//! Aggregation mechanics across checkpoint depths
//!
//! Drives single-family trees through the default and custom checkpoint
//! schedules and checks where aggregates form, what they absorb and what
//! the hit records report.

use nettally::{AddrFamily, FamilyTree, PrefixLimits, Tree, TreeError};

fn leaf_views<T>(tree: &FamilyTree<T>) -> Vec<(String, u64, bool)> {
    tree.leafs()
        .map(|n| (n.network().to_string(), n.hit_count(), n.aggregated()))
        .collect()
}

#[test]
fn test_v4_ladder_aggregates_at_30() {
    let mut tree: Tree<()> = Tree::new();
    tree.add("192.0.2.0").unwrap();
    tree.add("192.0.2.1").unwrap();
    let hit = tree.add("192.0.2.2").unwrap();

    // three hosts inside one /30 exceed its limit of 2
    assert!(hit.node.aggregated());
    assert_eq!(hit.node.network().to_string(), "192.0.2.0/30");
    assert_eq!(hit.node.hit_count(), 3);
}

#[test]
fn test_aggregates_cascade_to_shallower_checkpoints() {
    let mut tree: FamilyTree<()> = FamilyTree::new(AddrFamily::V6);

    // first group collapses into a /112 aggregate as usual
    tree.add("2001:db8::1").unwrap();
    tree.add("2001:db8::2").unwrap();
    tree.add("2001:db8::3").unwrap();
    assert_eq!(leaf_views(&tree), vec![("2001:db8::/112".to_string(), 3, true)]);

    // hosts in a sibling /112 count toward the same /96 anchor; the
    // fourth distinct leaf below it crosses that checkpoint's limit of 3
    tree.add("2001:db8::1:1").unwrap();
    tree.add("2001:db8::1:2").unwrap();
    let hit = tree.add("2001:db8::1:3").unwrap();

    assert!(hit.node.aggregated());
    assert_eq!(hit.node.network().to_string(), "2001:db8::/96");
    assert_eq!(hit.node.hit_count(), 6);

    // the old aggregate and the sibling hosts fold in; the host that
    // triggered the collapse never materializes on its own
    let removed: Vec<String> = hit
        .leafs_removed
        .iter()
        .map(|n| n.network().to_string())
        .collect();
    assert_eq!(
        removed,
        vec![
            "2001:db8::/112".to_string(),
            "2001:db8::1:1".to_string(),
            "2001:db8::1:2".to_string(),
        ]
    );
    assert_eq!(leaf_views(&tree), vec![("2001:db8::/96".to_string(), 6, true)]);
}

#[test]
fn test_only_the_shallowest_firing_checkpoint_wins() {
    // limits chosen so one insert pushes both /24 and /28 past their
    // limits at once; the collapse must land on the /24
    let limits =
        PrefixLimits::new(AddrFamily::V4, &[(0, 0), (24, 3), (28, 1), (32, 0)]).unwrap();
    let mut tree: FamilyTree<()> = FamilyTree::with_limits(limits);

    tree.add("10.0.0.1").unwrap();
    tree.add("10.0.0.17").unwrap();
    tree.add("10.0.0.33").unwrap();
    // a second host in 10.0.0.32/28 exceeds that checkpoint (limit 1)
    // and at the same time gives the /24 its fourth leaf (limit 3)
    let hit = tree.add("10.0.0.35").unwrap();

    assert!(hit.node.aggregated());
    assert_eq!(hit.node.network().to_string(), "10.0.0.0/24");
    assert_eq!(hit.node.hit_count(), 4);
    assert_eq!(tree.leaf_count(), 1);
}

#[test]
fn test_aggregate_absorbs_without_leaf_churn() {
    let mut tree: Tree<()> = Tree::new();
    for addr in ["198.51.100.0", "198.51.100.1", "198.51.100.2"] {
        tree.add(addr).unwrap();
    }

    // every further hit in the range lands on the same aggregate
    for (i, addr) in ["198.51.100.3", "198.51.100.1", "198.51.100.0"]
        .iter()
        .enumerate()
    {
        let hit = tree.add(*addr).unwrap();
        assert!(hit.node.aggregated());
        assert_eq!(hit.node.hit_count(), 4 + i as u64);
        assert!(hit.leafs_added.is_empty());
        assert!(hit.leafs_removed.is_empty());
    }
    assert_eq!(tree.leafs().count(), 1);
}

#[test]
fn test_disabled_checkpoint_never_aggregates() {
    let limits = PrefixLimits::new(AddrFamily::V4, &[(0, 0), (24, 0), (32, 0)]).unwrap();
    let mut tree: FamilyTree<()> = FamilyTree::with_limits(limits);

    for host in 0..40u32 {
        tree.add(format!("203.0.113.{}", host)).unwrap();
    }
    assert_eq!(tree.leaf_count(), 40);
    assert!(tree.leafs().all(|n| !n.aggregated()));
}

#[test]
fn test_hits_are_conserved_through_aggregation() {
    let mut tree: FamilyTree<()> = FamilyTree::new(AddrFamily::V6);
    let mut adds = 0u64;
    for group in 0..4u32 {
        for host in 1..=3u32 {
            for _ in 0..=host {
                tree.add(format!("2001:db8::{:x}:{:x}", group, host)).unwrap();
                adds += 1;
            }
        }
    }
    let total: u64 = tree.leafs().map(|n| n.hit_count()).sum();
    assert_eq!(total, adds);
}

#[test]
fn test_removal_inside_aggregate_is_exact_miss() {
    let mut tree: Tree<()> = Tree::new();
    for addr in ["2001:db8::1", "2001:db8::2", "2001:db8::3"] {
        tree.add(addr).unwrap();
    }

    // the collapsed hosts no longer exist as exact nodes
    assert!(matches!(
        tree.remove("2001:db8::1"),
        Err(TreeError::NotFound(_))
    ));
    assert_eq!(tree.leafs().count(), 1);
}

#[test]
fn test_range_restarts_clean_after_aggregate_removal() {
    let mut tree: Tree<()> = Tree::new();
    for addr in ["2001:db8::1", "2001:db8::2", "2001:db8::3"] {
        tree.add(addr).unwrap();
    }
    tree.remove("2001:db8::/112").unwrap();

    // the range tracks individual hosts again from scratch
    let hit = tree.add("2001:db8::1").unwrap();
    assert!(!hit.node.aggregated());
    assert_eq!(hit.node.hit_count(), 1);
    assert_eq!(tree.leafs().count(), 1);
}

#[test]
fn test_aggregate_depths_come_from_the_schedule() {
    let mut tree: FamilyTree<()> = FamilyTree::new(AddrFamily::V6);
    for group in 0..6u32 {
        for host in 1..=3u32 {
            tree.add(format!("2001:db8:0:{:x}::{:x}", group, host)).unwrap();
        }
    }
    let schedule = tree.prefix_limits();
    for node in tree.leafs().filter(|n| n.aggregated()) {
        let depth = node.network().prefix_len();
        assert!(
            schedule.aggregating().any(|(d, _)| d == depth),
            "aggregate at unconfigured depth {}",
            depth
        );
    }
}
