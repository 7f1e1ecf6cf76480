//! Aggregating prefix tree for one address family
//!
//! The tree is a path-compressed binary trie over network prefixes, stored
//! in an arena with free-slot recycling. Hosts enter as full-width leaves;
//! once the number of distinct leaves below a configured checkpoint depth
//! exceeds its limit, the whole subtree collapses into a single aggregate
//! leaf at that depth, which keeps absorbing hits for its range from then
//! on. Hit totals are preserved across aggregation, so the sum of leaf
//! counts always equals the number of admitted hits.

use crate::error::{Result, TreeError};
use crate::hooks::DataHooks;
use crate::limits::PrefixLimits;
use crate::network::{AddrFamily, IntoNetwork, Network};
use std::fmt;
use std::sync::Arc;

/// Arena index of a node within its family tree
type NodeId = u32;

/// The root occupies slot 0 for the whole life of the tree
const ROOT: NodeId = 0;

/// One node of a family tree
///
/// A node is either a leaf (no children) or an internal routing node with
/// one or two children. Hits are recorded only on leaves; aggregates are
/// always leaves. The root is a permanent sentinel at prefix length 0 and
/// never carries hits itself.
pub struct Node<T> {
    network: Network,
    hit_count: u64,
    aggregated: bool,
    data: Option<T>,
    parent: Option<NodeId>,
    children: [Option<NodeId>; 2],
}

impl<T> Node<T> {
    fn new(network: Network, data: Option<T>) -> Self {
        Self {
            network,
            hit_count: 0,
            aggregated: false,
            data,
            parent: None,
            children: [None, None],
        }
    }

    /// The network this node covers
    pub fn network(&self) -> Network {
        self.network
    }

    /// Number of hits recorded into this node
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Whether this node was produced by collapsing a subtree
    pub fn aggregated(&self) -> bool {
        self.aggregated
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(Option::is_none)
    }

    /// User data attached by the hooks, if any
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Mutable access to the attached user data
    pub fn data_mut(&mut self) -> Option<&mut T> {
        self.data.as_mut()
    }
}

impl<T> fmt::Display for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<IPNode: {}>", self.network)
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("network", &format_args!("{}", self.network))
            .field("hit_count", &self.hit_count)
            .field("aggregated", &self.aggregated)
            .field("data", &self.data)
            .finish()
    }
}

/// Outcome of a single [`FamilyTree::add`] call
///
/// Reports the node the hit landed on and the delta in the leaf set:
/// `leafs_removed` holds leaves that existed before the call and were
/// collapsed away by aggregation, `leafs_added` holds at most one entry,
/// the newly created leaf or aggregate. A host leaf created and collapsed
/// within the same call appears on neither list.
#[derive(Debug)]
pub struct Hit<'a, T> {
    /// The node that absorbed the hit
    pub node: &'a Node<T>,
    /// Pre-existing leaves that disappeared during the call
    pub leafs_removed: Vec<Node<T>>,
    /// Leaves newly present as a result of the call
    pub leafs_added: Vec<&'a Node<T>>,
}

/// Where a descending hit landed
enum Landed {
    /// An existing aggregate covering the address
    Absorbed(NodeId),
    /// An existing host leaf for the address
    Existing(NodeId),
    /// A freshly created host leaf
    Created(NodeId),
}

/// Threshold-aggregating prefix tree for a single address family
///
/// Single-owner and synchronous: every operation completes before control
/// returns and no internal locking exists. Callers that share a tree
/// across threads wrap it in their own mutual exclusion.
pub struct FamilyTree<T> {
    family: AddrFamily,
    limits: PrefixLimits,
    hooks: Arc<DataHooks<T>>,
    slots: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
}

impl<T> FamilyTree<T> {
    /// Create a tree with the family's default checkpoint schedule
    pub fn new(family: AddrFamily) -> Self {
        Self::with_limits(PrefixLimits::default_for(family))
    }

    /// Create a tree with a custom (already validated) schedule
    pub fn with_limits(limits: PrefixLimits) -> Self {
        let family = limits.family();
        let root = Node::new(Network::root(family), None);
        Self {
            family,
            limits,
            hooks: Arc::new(DataHooks::new()),
            slots: vec![Some(root)],
            free: Vec::new(),
        }
    }

    /// Attach user-data hooks (builder style)
    ///
    /// Accepts a plain [`DataHooks`] value or an `Arc` already shared with
    /// another tree.
    pub fn with_hooks(mut self, hooks: impl Into<Arc<DataHooks<T>>>) -> Self {
        self.hooks = hooks.into();
        self
    }

    /// The address family this tree tracks
    pub fn family(&self) -> AddrFamily {
        self.family
    }

    /// The checkpoint schedule in effect
    pub fn prefix_limits(&self) -> &PrefixLimits {
        &self.limits
    }

    /// Number of leaves currently tracked
    pub fn leaf_count(&self) -> usize {
        self.leafs().count()
    }

    // ---- arena plumbing ----

    fn node(&self, id: NodeId) -> &Node<T> {
        self.slots[id as usize]
            .as_ref()
            .expect("node id points at a freed slot")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.slots[id as usize]
            .as_mut()
            .expect("node id points at a freed slot")
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(node);
                id
            }
            None => {
                let id = self.slots.len() as NodeId;
                self.slots.push(Some(node));
                id
            }
        }
    }

    fn dealloc(&mut self, id: NodeId) -> Node<T> {
        let node = self.slots[id as usize]
            .take()
            .expect("double free of a node slot");
        self.free.push(id);
        node
    }

    fn attach(&mut self, parent: NodeId, slot: usize, child: NodeId) {
        self.node_mut(parent).children[slot] = Some(child);
        self.node_mut(child).parent = Some(parent);
    }

    // ---- add ----

    /// Record one hit against a host address
    ///
    /// The key must resolve to a full-width network of this tree's family.
    /// Landing on an existing aggregate bumps its counter; otherwise the
    /// host leaf is found or created, and checkpoint limits on its path
    /// are enforced, possibly collapsing a subtree into a new aggregate.
    /// The returned [`Hit`] reports the landing node and the leaf-set
    /// delta. Precondition failures reject the call before any mutation.
    pub fn add<K: IntoNetwork>(&mut self, key: K) -> Result<Hit<'_, T>> {
        let address = key.into_network()?;
        if address.family() != self.family {
            return Err(TreeError::Malformed(format!(
                "{} does not belong to the {:?} family",
                address, self.family
            )));
        }
        if !address.is_host() {
            return Err(TreeError::Malformed(format!(
                "add() takes a single host address, got {}",
                address
            )));
        }

        let landed = self.descend(address);
        let hooks = Arc::clone(&self.hooks);
        match landed {
            Landed::Absorbed(id) | Landed::Existing(id) => {
                let node = self.node_mut(id);
                node.hit_count += 1;
                hooks.fire_add(&mut node.data);
                // the leaf set did not change, so no checkpoint can newly
                // exceed its limit
                Ok(Hit {
                    node: self.node(id),
                    leafs_removed: Vec::new(),
                    leafs_added: Vec::new(),
                })
            }
            Landed::Created(leaf) => match self.exceeded_checkpoint(&address) {
                Some((depth, sub)) => {
                    let anchor = address.supernet(depth);
                    let (agg, removed) = self.collapse(sub, anchor, leaf);
                    Ok(Hit {
                        node: self.node(agg),
                        leafs_removed: removed,
                        leafs_added: vec![self.node(agg)],
                    })
                }
                None => Ok(Hit {
                    node: self.node(leaf),
                    leafs_removed: Vec::new(),
                    leafs_added: vec![self.node(leaf)],
                }),
            },
        }
    }

    /// Walk toward `address`, creating the host leaf if no aggregate or
    /// existing leaf covers it
    fn descend(&mut self, address: Network) -> Landed {
        let mut cur = ROOT;
        loop {
            let node = self.node(cur);
            // every visited node contains the address
            if node.aggregated {
                return Landed::Absorbed(cur);
            }
            if node.network.prefix_len() == address.prefix_len() {
                return Landed::Existing(cur);
            }
            let slot = address.bit_at(node.network.prefix_len()) as usize;
            let next = node.children[slot];
            match next {
                None => {
                    let leaf = self.new_leaf(address);
                    self.attach(cur, slot, leaf);
                    return Landed::Created(leaf);
                }
                Some(child) if self.node(child).network.contains(&address) => {
                    cur = child;
                }
                Some(child) => {
                    return Landed::Created(self.branch(cur, slot, child, address));
                }
            }
        }
    }

    fn new_leaf(&mut self, address: Network) -> NodeId {
        let data = self.hooks.initial_data();
        let mut node = Node::new(address, data);
        node.hit_count = 1;
        self.alloc(node)
    }

    /// Split the edge to `child` where it diverges from `address`,
    /// inserting a routing node at the minimal distinguishing depth
    fn branch(&mut self, parent: NodeId, slot: usize, child: NodeId, address: Network) -> NodeId {
        let child_net = self.node(child).network;
        let fork_len = child_net.common_prefix_len(&address);
        let fork = self.alloc(Node::new(address.supernet(fork_len), None));
        let leaf = self.new_leaf(address);
        self.attach(parent, slot, fork);
        self.attach(fork, child_net.bit_at(fork_len) as usize, child);
        self.attach(fork, address.bit_at(fork_len) as usize, leaf);
        leaf
    }

    // ---- aggregation ----

    /// Shallowest checkpoint whose distinct-leaf count now exceeds its
    /// limit, along with the subtree it governs
    fn exceeded_checkpoint(&self, address: &Network) -> Option<(u8, NodeId)> {
        for (depth, limit) in self.limits.aggregating() {
            let Some(sub) = self.anchor_subtree(address, depth) else {
                continue;
            };
            if self.count_leaves(sub) > limit as usize {
                return Some((depth, sub));
            }
        }
        None
    }

    /// First node at or below `depth` on the descent path toward `address`
    ///
    /// All leaves inside the depth-`depth` anchor around the address live
    /// in this node's subtree: shallower ancestors branch on a bit inside
    /// the anchor prefix, so their other children fall outside it.
    fn anchor_subtree(&self, address: &Network, depth: u8) -> Option<NodeId> {
        let mut cur = ROOT;
        while self.node(cur).network.prefix_len() < depth {
            let slot = address.bit_at(self.node(cur).network.prefix_len()) as usize;
            cur = self.node(cur).children[slot]?;
            debug_assert!(self.node(cur).network.contains(address));
        }
        Some(cur)
    }

    fn count_leaves(&self, sub: NodeId) -> usize {
        let mut count = 0;
        let mut stack = vec![sub];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            if node.is_leaf() {
                count += 1;
            } else {
                stack.extend(node.children.iter().flatten().copied());
            }
        }
        count
    }

    /// Replace the subtree at `sub` with one aggregate leaf covering
    /// `anchor`
    ///
    /// The aggregate inherits the summed hit count of the collapsed
    /// leaves. Leaves are collected in ascending network order; `fresh`
    /// (the leaf created by the ongoing call) is folded into the totals
    /// but kept off the removed list. Freed slots are recycled before the
    /// call returns.
    fn collapse(&mut self, sub: NodeId, anchor: Network, fresh: NodeId) -> (NodeId, Vec<Node<T>>) {
        debug_assert!(anchor.contains(&self.node(sub).network));
        let parent = self
            .node(sub)
            .parent
            .expect("a checkpoint anchor is never the root");
        let pslot = anchor.bit_at(self.node(parent).network.prefix_len()) as usize;

        // preorder walk, bit-0 side first, so leaves come out in ascending
        // network order
        let mut order = Vec::new();
        let mut stack = vec![sub];
        while let Some(id) = stack.pop() {
            order.push(id);
            let node = self.node(id);
            for slot in [1, 0] {
                if let Some(child) = node.children[slot] {
                    stack.push(child);
                }
            }
        }

        let mut total = 0u64;
        let mut from_data = Vec::new();
        let mut removed = Vec::new();
        for id in order {
            let mut node = self.dealloc(id);
            if node.is_leaf() {
                total += node.hit_count;
                if let Some(data) = node.data.take() {
                    from_data.push(data);
                }
                if id != fresh {
                    node.parent = None;
                    removed.push(node);
                }
            }
        }

        let hooks = Arc::clone(&self.hooks);
        let mut agg = Node::new(anchor, hooks.initial_data());
        agg.aggregated = true;
        agg.hit_count = total;
        hooks.fire_aggregate(&mut agg.data, from_data);

        let agg_id = self.alloc(agg);
        self.attach(parent, pslot, agg_id);
        (agg_id, removed)
    }

    // ---- lookup ----

    /// Look up the node covering `key`
    ///
    /// Returns the deepest leaf or aggregate whose network contains the
    /// key; a host inside an aggregate resolves to the aggregate. Routing
    /// nodes and the root sentinel are reachable only by exact match.
    pub fn get<K: IntoNetwork>(&self, key: K) -> Result<&Node<T>> {
        let network = key.into_network()?;
        if network.family() != self.family {
            return Err(TreeError::Malformed(format!(
                "{} does not belong to the {:?} family",
                network, self.family
            )));
        }
        let id = self
            .locate(&network)
            .ok_or_else(|| TreeError::NotFound(network.to_string()))?;
        Ok(self.node(id))
    }

    fn locate(&self, network: &Network) -> Option<NodeId> {
        let mut cur = ROOT;
        loop {
            let node = self.node(cur);
            if node.network == *network {
                return Some(cur);
            }
            let slot = network.bit_at(node.network.prefix_len()) as usize;
            match node.children[slot] {
                Some(child) if self.node(child).network.contains(network) => cur = child,
                _ => break,
            }
        }
        // deepest node containing the query; the root is a sentinel, not
        // a tracked leaf
        if cur != ROOT && self.node(cur).is_leaf() {
            Some(cur)
        } else {
            None
        }
    }

    fn locate_exact(&self, network: &Network) -> Option<NodeId> {
        let mut cur = ROOT;
        loop {
            let node = self.node(cur);
            if node.network == *network {
                return Some(cur);
            }
            if node.network.prefix_len() >= network.prefix_len() {
                return None;
            }
            let slot = network.bit_at(node.network.prefix_len()) as usize;
            match node.children[slot] {
                Some(child) if self.node(child).network.contains(network) => cur = child,
                _ => return None,
            }
        }
    }

    // ---- removal ----

    /// Detach the node whose network is exactly `key`
    ///
    /// The node's whole subtree is released; chains of now-childless
    /// routing ancestors are pruned up to (never including) the root. No
    /// hooks fire. Returns the detached node with its links cleared.
    pub fn remove<K: IntoNetwork>(&mut self, key: K) -> Result<Node<T>> {
        let network = key.into_network()?;
        if network.family() != self.family {
            return Err(TreeError::Malformed(format!(
                "{} does not belong to the {:?} family",
                network, self.family
            )));
        }
        if network.prefix_len() == 0 {
            return Err(TreeError::Malformed(format!(
                "the root {} cannot be removed",
                network
            )));
        }
        let id = self
            .locate_exact(&network)
            .ok_or_else(|| TreeError::NotFound(network.to_string()))?;

        let parent = self.node(id).parent.expect("non-root node has a parent");
        let pslot = network.bit_at(self.node(parent).network.prefix_len()) as usize;
        self.node_mut(parent).children[pslot] = None;

        // release the detached subtree, keeping only its top node
        let mut detached = None;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let mut node = self.dealloc(cur);
            stack.extend(node.children.iter().flatten().copied());
            if cur == id {
                node.parent = None;
                node.children = [None, None];
                detached = Some(node);
            }
        }

        // prune routing skeleton left childless by the detach
        let mut cur = parent;
        while cur != ROOT && self.node(cur).is_leaf() {
            let up = self.node(cur).parent.expect("non-root node has a parent");
            let slot = network.bit_at(self.node(up).network.prefix_len()) as usize;
            self.node_mut(up).children[slot] = None;
            self.dealloc(cur);
            cur = up;
        }

        Ok(detached.expect("detached subtree root was collected"))
    }

    // ---- enumeration ----

    /// Iterate over all leaf and aggregate nodes
    ///
    /// Lazy, finite and restartable; each call starts a fresh traversal of
    /// the current state. Order is deterministic: depth-first with the
    /// bit-1 child visited before the bit-0 child, which surfaces the most
    /// recently active side of the tree first. The order is documented
    /// behavior, not a stability contract.
    pub fn leafs(&self) -> Leafs<'_, T> {
        Leafs {
            tree: self,
            stack: vec![ROOT],
        }
    }
}

/// Lazy traversal over the leaves of a [`FamilyTree`]
///
/// Created by [`FamilyTree::leafs`].
pub struct Leafs<'a, T> {
    tree: &'a FamilyTree<T>,
    stack: Vec<NodeId>,
}

impl<'a, T> Iterator for Leafs<'a, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let node = self.tree.node(id);
            if node.is_leaf() {
                // a childless root is structural, not a tracked leaf
                if id != ROOT {
                    return Some(node);
                }
            } else {
                // bit-0 pushed first so the bit-1 side pops first
                self.stack.extend(node.children.iter().flatten().copied());
            }
        }
        None
    }
}
