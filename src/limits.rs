//! Aggregation checkpoint configuration
//!
//! A family tree is parameterized by an ordered `(depth, limit)` schedule.
//! Each entry marks a checkpoint prefix length; a non-zero limit is the
//! maximum number of distinct leaves tolerated under a single prefix of
//! that length before the subtree collapses into one aggregate. A zero
//! limit keeps the depth as a checkpoint with aggregation disabled.

use crate::error::{Result, TreeError};
use crate::network::AddrFamily;

/// Default schedule for IPv6 trees
const DEFAULT_V6: [(u8, u32); 9] = [
    (0, 0),
    (32, 0),
    (48, 50),
    (56, 10),
    (64, 5),
    (80, 4),
    (96, 3),
    (112, 2),
    (128, 0),
];

/// Default schedule for IPv4 trees, the IPv6 ladder transposed onto 0-32
const DEFAULT_V4: [(u8, u32); 9] = [
    (0, 0),
    (8, 0),
    (16, 50),
    (20, 10),
    (24, 5),
    (26, 4),
    (28, 3),
    (30, 2),
    (32, 0),
];

/// Validated checkpoint schedule for one family tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLimits {
    family: AddrFamily,
    entries: Vec<(u8, u32)>,
}

impl PrefixLimits {
    /// Validate and build a schedule
    ///
    /// Depths must be strictly increasing, the first entry must be `(0, 0)`
    /// and the last `(width, 0)` for the family's bit width.
    pub fn new(family: AddrFamily, entries: &[(u8, u32)]) -> Result<Self> {
        let width = family.width();
        match entries.first() {
            None => {
                return Err(TreeError::Misconfigured(
                    "prefix limits are empty".to_string(),
                ))
            }
            Some(&(depth, limit)) if depth != 0 || limit != 0 => {
                return Err(TreeError::Misconfigured(format!(
                    "first prefix limit must be (0, 0), got ({}, {})",
                    depth, limit
                )));
            }
            Some(_) => {}
        }
        match entries.last() {
            Some(&(depth, limit)) if depth != width || limit != 0 => {
                return Err(TreeError::Misconfigured(format!(
                    "last prefix limit must be ({}, 0), got ({}, {})",
                    width, depth, limit
                )));
            }
            _ => {}
        }
        for pair in entries.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(TreeError::Misconfigured(format!(
                    "prefix limit depths must be strictly increasing, \
                     ({}, {}) follows depth {}",
                    pair[1].0, pair[1].1, pair[0].0
                )));
            }
        }
        Ok(Self {
            family,
            entries: entries.to_vec(),
        })
    }

    /// Default schedule for a family
    pub fn default_for(family: AddrFamily) -> Self {
        let entries = match family {
            AddrFamily::V4 => DEFAULT_V4.to_vec(),
            AddrFamily::V6 => DEFAULT_V6.to_vec(),
        };
        Self { family, entries }
    }

    /// The family this schedule was validated against
    pub fn family(&self) -> AddrFamily {
        self.family
    }

    /// The full `(depth, limit)` schedule
    pub fn entries(&self) -> &[(u8, u32)] {
        &self.entries
    }

    /// Checkpoints with a live limit, shallowest first
    pub fn aggregating(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.entries.iter().copied().filter(|&(_, limit)| limit > 0)
    }
}
