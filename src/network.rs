//! Network prefixes and family-scoped bit operations
//!
//! A [`Network`] is a `(family, bits, prefix_len)` triple identifying a
//! contiguous block of addresses. Address bits are kept left-aligned in a
//! `u128` regardless of family (an IPv4 address occupies the top 32 bits),
//! so the same shift-and-mask arithmetic serves both families. Bits below
//! the prefix length are always zero.

use crate::error::{Result, TreeError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Address family tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddrFamily {
    /// IPv4 (32-bit addresses)
    V4,
    /// IPv6 (128-bit addresses)
    V6,
}

impl AddrFamily {
    /// Bit width of addresses in this family
    pub fn width(self) -> u8 {
        match self {
            AddrFamily::V4 => 32,
            AddrFamily::V6 => 128,
        }
    }
}

/// Mask covering the high `prefix_len` bits of a left-aligned address
fn mask(prefix_len: u8) -> u128 {
    if prefix_len == 0 {
        0
    } else {
        u128::MAX << (128 - prefix_len as u32)
    }
}

/// A network prefix: address family, address bits and prefix length
///
/// Only the high `prefix_len` bits are significant; constructors reject
/// values with non-zero host bits. Two networks are equal iff family, bits
/// and prefix length all match, so the same bit pattern in different
/// families never compares equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Network {
    family: AddrFamily,
    bits: u128,
    prefix_len: u8,
}

impl Network {
    /// Build a network from raw left-aligned bits
    pub fn new(family: AddrFamily, bits: u128, prefix_len: u8) -> Result<Self> {
        if prefix_len > family.width() {
            return Err(TreeError::Malformed(format!(
                "prefix length /{} exceeds the {:?} width of {}",
                prefix_len,
                family,
                family.width()
            )));
        }
        if bits & !mask(prefix_len) != 0 {
            return Err(TreeError::Malformed(format!(
                "bits {:#034x} extend past the /{} prefix",
                bits, prefix_len
            )));
        }
        Ok(Self {
            family,
            bits,
            prefix_len,
        })
    }

    /// The zero-length network covering an entire family
    pub fn root(family: AddrFamily) -> Self {
        Self {
            family,
            bits: 0,
            prefix_len: 0,
        }
    }

    /// Full-width host network for a single address
    pub fn from_addr(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self {
                family: AddrFamily::V4,
                bits: (u32::from(v4) as u128) << 96,
                prefix_len: 32,
            },
            IpAddr::V6(v6) => Self {
                family: AddrFamily::V6,
                bits: u128::from(v6),
                prefix_len: 128,
            },
        }
    }

    /// Network for an address plus explicit prefix length
    ///
    /// Rejects prefix lengths beyond the family width and addresses with
    /// bits set below the prefix.
    pub fn from_cidr(addr: IpAddr, prefix_len: u8) -> Result<Self> {
        let host = Self::from_addr(addr);
        if prefix_len > host.family.width() {
            return Err(TreeError::Malformed(format!(
                "prefix length in {}/{} exceeds the family width of {}",
                addr,
                prefix_len,
                host.family.width()
            )));
        }
        if host.bits & !mask(prefix_len) != 0 {
            return Err(TreeError::Malformed(format!(
                "{}/{} has non-zero host bits",
                addr, prefix_len
            )));
        }
        Ok(Self {
            family: host.family,
            bits: host.bits,
            prefix_len,
        })
    }

    /// Address family of this network
    pub fn family(&self) -> AddrFamily {
        self.family
    }

    /// Prefix length in bits
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Raw left-aligned address bits
    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// Whether this is a single host (full-width prefix)
    pub fn is_host(&self) -> bool {
        self.prefix_len == self.family.width()
    }

    /// The address part as a `std::net` value
    pub fn addr(&self) -> IpAddr {
        match self.family {
            AddrFamily::V4 => IpAddr::V4(Ipv4Addr::from((self.bits >> 96) as u32)),
            AddrFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.bits)),
        }
    }

    /// True iff `other` is the same family and falls inside this prefix
    pub fn contains(&self, other: &Network) -> bool {
        self.family == other.family
            && self.prefix_len <= other.prefix_len
            && (self.bits ^ other.bits) & mask(self.prefix_len) == 0
    }

    /// Bit `i` counted from the most significant end (0 or 1)
    ///
    /// `i` must be below the family width.
    pub fn bit_at(&self, i: u8) -> u8 {
        debug_assert!(i < self.family.width());
        ((self.bits >> (127 - i as u32)) & 1) as u8
    }

    /// The enclosing network at a shorter prefix length
    ///
    /// `new_len` must not exceed the current prefix length.
    pub fn supernet(&self, new_len: u8) -> Network {
        debug_assert!(new_len <= self.prefix_len);
        Network {
            family: self.family,
            bits: self.bits & mask(new_len),
            prefix_len: new_len,
        }
    }

    /// Length of the longest prefix shared with `other`
    ///
    /// Capped at both prefix lengths; both networks must be the same family.
    pub fn common_prefix_len(&self, other: &Network) -> u8 {
        debug_assert_eq!(self.family, other.family);
        // leading_zeros of an equal pair is 128, the cap handles it
        let diverge = (self.bits ^ other.bits).leading_zeros() as u8;
        diverge.min(self.prefix_len).min(other.prefix_len)
    }
}

impl FromStr for Network {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((addr_part, len_part)) => {
                let addr: IpAddr = addr_part.trim().parse()?;
                let prefix_len: u8 = len_part.trim().parse().map_err(|_| {
                    TreeError::Malformed(format!("invalid prefix length in '{}'", s))
                })?;
                Self::from_cidr(addr, prefix_len)
            }
            None => Ok(Self::from_addr(s.trim().parse()?)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "{}", self.addr())
        } else {
            write!(f, "{}/{}", self.addr(), self.prefix_len)
        }
    }
}

impl Serialize for Network {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Conversion into a [`Network`], accepted anywhere the trees take a key
///
/// Implemented for `Network` itself, textual forms (bare address or CIDR)
/// and `std::net::IpAddr`.
pub trait IntoNetwork {
    /// Perform the conversion
    fn into_network(self) -> Result<Network>;
}

impl IntoNetwork for Network {
    fn into_network(self) -> Result<Network> {
        Ok(self)
    }
}

impl IntoNetwork for &Network {
    fn into_network(self) -> Result<Network> {
        Ok(*self)
    }
}

impl IntoNetwork for &str {
    fn into_network(self) -> Result<Network> {
        self.parse()
    }
}

impl IntoNetwork for String {
    fn into_network(self) -> Result<Network> {
        self.parse()
    }
}

impl IntoNetwork for IpAddr {
    fn into_network(self) -> Result<Network> {
        Ok(Network::from_addr(self))
    }
}
