//! Dual-family façade
//!
//! [`Tree`] holds one IPv6 and one IPv4 [`FamilyTree`] behind a single
//! surface and routes every operation by the family tag of the parsed
//! key, so callers track both address families without caring which is
//! which. Operations on one family never touch the other.

use crate::error::Result;
use crate::family_tree::{FamilyTree, Hit, Node};
use crate::hooks::DataHooks;
use crate::limits::PrefixLimits;
use crate::network::{AddrFamily, IntoNetwork};
use std::sync::Arc;

/// Dual-family aggregating tree
///
/// ```rust
/// use nettally::Tree;
///
/// let mut tree: Tree<()> = Tree::new();
/// tree.add("192.0.2.1")?;
/// tree.add("2001:db8::1")?;
/// assert_eq!(tree.leafs().count(), 2);
/// # Ok::<(), nettally::TreeError>(())
/// ```
pub struct Tree<T> {
    v6: FamilyTree<T>,
    v4: FamilyTree<T>,
}

impl<T> Tree<T> {
    /// Tree with default checkpoint schedules and no hooks
    pub fn new() -> Self {
        Self {
            v6: FamilyTree::new(AddrFamily::V6),
            v4: FamilyTree::new(AddrFamily::V4),
        }
    }

    /// Tree with custom per-family checkpoint schedules
    ///
    /// Each schedule carries the family it was validated against; the
    /// arguments must be a V6 and a V4 schedule, in that order.
    pub fn with_limits(v6: PrefixLimits, v4: PrefixLimits) -> Self {
        debug_assert_eq!(v6.family(), AddrFamily::V6);
        debug_assert_eq!(v4.family(), AddrFamily::V4);
        Self {
            v6: FamilyTree::with_limits(v6),
            v4: FamilyTree::with_limits(v4),
        }
    }

    /// Attach user-data hooks, shared by both family trees
    pub fn with_hooks(mut self, hooks: DataHooks<T>) -> Self {
        let hooks = Arc::new(hooks);
        self.v6 = self.v6.with_hooks(Arc::clone(&hooks));
        self.v4 = self.v4.with_hooks(hooks);
        self
    }

    /// Record one hit against a host address of either family
    pub fn add<K: IntoNetwork>(&mut self, key: K) -> Result<Hit<'_, T>> {
        let network = key.into_network()?;
        match network.family() {
            AddrFamily::V6 => self.v6.add(network),
            AddrFamily::V4 => self.v4.add(network),
        }
    }

    /// Look up the node covering `key` in its family's tree
    pub fn get<K: IntoNetwork>(&self, key: K) -> Result<&Node<T>> {
        let network = key.into_network()?;
        match network.family() {
            AddrFamily::V6 => self.v6.get(network),
            AddrFamily::V4 => self.v4.get(network),
        }
    }

    /// Detach the exactly matching node from its family's tree
    pub fn remove<K: IntoNetwork>(&mut self, key: K) -> Result<Node<T>> {
        let network = key.into_network()?;
        match network.family() {
            AddrFamily::V6 => self.v6.remove(network),
            AddrFamily::V4 => self.v4.remove(network),
        }
    }

    /// Iterate over all leaves, the IPv6 family's first
    pub fn leafs(&self) -> impl Iterator<Item = &Node<T>> {
        self.v6.leafs().chain(self.v4.leafs())
    }

    /// The IPv6 family tree
    pub fn v6(&self) -> &FamilyTree<T> {
        &self.v6
    }

    /// The IPv4 family tree
    pub fn v4(&self) -> &FamilyTree<T> {
        &self.v4
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}
