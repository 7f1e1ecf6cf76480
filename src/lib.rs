//! Nettally - Bounded Hit Tracking for IP Addresses
//!
//! Nettally counts "hits" against IPv4 and IPv6 addresses while keeping
//! memory bounded: individual addresses enter a binary prefix tree as
//! leaves, and once too many distinct leaves accumulate under a configured
//! prefix depth, they collapse into a single aggregate that keeps counting
//! for the whole range. The tracked set stays small enough to feed
//! firewall rulesets, rate-limit tables and similar downstream consumers.
//!
//! # Quick Start
//!
//! ```rust
//! use nettally::Tree;
//!
//! let mut tree: Tree<()> = Tree::new();
//!
//! // Individual hosts are tracked exactly...
//! tree.add("2001:db8::1")?;
//! tree.add("2001:db8::2")?;
//!
//! // ...until a third distinct host under 2001:db8::/112 crosses the
//! // default limit for that depth and the subtree collapses.
//! let hit = tree.add("2001:db8::3")?;
//! assert!(hit.node.aggregated());
//! assert_eq!(hit.node.network().to_string(), "2001:db8::/112");
//! assert_eq!(hit.node.hit_count(), 3);
//!
//! // The aggregate answers for every address in its range from now on.
//! assert_eq!(tree.get("2001:db8::42")?.hit_count(), 3);
//! # Ok::<(), nettally::TreeError>(())
//! ```
//!
//! # Key Features
//!
//! - **Exact counts, bounded identity**: totals are preserved through
//!   aggregation; only the identity of individual addresses is given up
//! - **Per-depth thresholds**: a configurable `(depth, limit)` schedule
//!   controls where and how eagerly ranges collapse
//! - **Dual-family façade**: one surface for IPv4 and IPv6, routed by the
//!   parsed address family
//! - **User-data hooks**: attach payloads to leaves and fold them together
//!   on aggregation
//! - **Pure data structure**: no I/O, no locking, no background activity;
//!   every operation is synchronous
//!
//! Hooks that want JSON-like payloads without a custom type can use
//! [`DataValue`]:
//!
//! ```rust
//! use nettally::{DataHooks, DataValue, Tree};
//!
//! let hooks = DataHooks::new()
//!     .on_initial(|| {
//!         let mut data = DataValue::empty_map();
//!         data.insert("counter", 1u64);
//!         data
//!     })
//!     .on_add(|data| {
//!         if let Some(DataValue::Uint64(count)) = data.get_mut("counter") {
//!             *count += 1;
//!         }
//!     });
//!
//! let mut tree = Tree::new().with_hooks(hooks);
//! tree.add("192.0.2.1")?;
//! tree.add("192.0.2.1")?;
//!
//! let node = tree.get("192.0.2.1")?;
//! let counter = node.data().and_then(|d| d.get("counter"));
//! assert_eq!(counter.and_then(DataValue::as_u64), Some(2));
//! # Ok::<(), nettally::TreeError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
/// Rich per-node payload type
pub mod data_value;
/// Error types for tree operations
pub mod error;
/// Single-family aggregating prefix tree
pub mod family_tree;
/// User-data lifecycle hooks
pub mod hooks;
/// Aggregation checkpoint configuration
pub mod limits;
/// Network prefixes and bit operations
pub mod network;
/// Dual-family façade
pub mod tree;

// Re-exports for the common surface

/// JSON-like per-node payload
pub use crate::data_value::DataValue;
/// Crate error and result types
pub use crate::error::{Result, TreeError};
/// Single-family tree and its node/hit/iterator types
pub use crate::family_tree::{FamilyTree, Hit, Leafs, Node};
/// User-data hook configuration
pub use crate::hooks::DataHooks;
/// Checkpoint schedule
pub use crate::limits::PrefixLimits;
/// Network value types and key conversion
pub use crate::network::{AddrFamily, IntoNetwork, Network};
/// Dual-family façade
pub use crate::tree::Tree;
