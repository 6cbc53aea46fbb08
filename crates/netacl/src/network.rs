//! Network addresses.
//!
//! A [`NetworkAddress`] is an address family, the address bits and a prefix
//! length. Bits beyond the prefix are cleared at construction, so two values
//! compare equal exactly when they describe the same network.
//!
//! Both families share one representation: the address is held in a `u128`
//! whose low `width` bits are significant (32 for IPv4, 128 for IPv6). The
//! literal syntax of each family is selected by a `match` on the family in
//! both parsing and `Display`.

use std::fmt::{self, Display};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AclError, Result};

// ============================================================================
// AddressFamily
// ============================================================================

/// The two IP address families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    /// 32-bit IPv4 addresses.
    V4,
    /// 128-bit IPv6 addresses.
    V6,
}

impl AddressFamily {
    /// Number of address bits in this family.
    pub const fn width(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// The network covering the whole address space of this family.
    pub const fn all(self) -> NetworkAddress {
        NetworkAddress {
            family: self,
            bits: 0,
            prefix_len: 0,
        }
    }

    /// Returns the mask with the top `prefix_len` bits of the family width set.
    ///
    /// `prefix_len` values above the width saturate to the full mask.
    pub fn mask(self, prefix_len: u8) -> u128 {
        let host_bits = u32::from(self.width().saturating_sub(prefix_len));
        u128::MAX.checked_shl(host_bits).unwrap_or(0) & self.full()
    }

    /// All bits of the family width set.
    fn full(self) -> u128 {
        match self {
            Self::V4 => u128::from(u32::MAX),
            Self::V6 => u128::MAX,
        }
    }

    /// Parses an address literal of this family into its bits.
    fn parse_bits(self, text: &str) -> Result<u128> {
        let bits = match self {
            Self::V4 => parse_v4(text).map(u128::from),
            Self::V6 => parse_v6(text),
        };
        bits.ok_or_else(|| AclError::InvalidAddress(format!("'{text}' is not a valid {self} address")))
    }

    fn check_prefix(self, prefix_len: u8) -> Result<()> {
        if prefix_len > self.width() {
            return Err(AclError::InvalidAddress(format!(
                "'{prefix_len}' is not a valid {self} prefix length (0..={})",
                self.width()
            )));
        }
        Ok(())
    }
}

impl Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

// ============================================================================
// NetworkAddress
// ============================================================================

/// An immutable, canonical IP network: family, address bits and prefix length.
///
/// # Examples
///
/// ```
/// use netacl::{AddressFamily, NetworkAddress};
///
/// let net = NetworkAddress::parse("10.1.2.3", 16, AddressFamily::V4).unwrap();
/// assert_eq!(net.to_string(), "10.1.0.0/16");
///
/// let host: NetworkAddress = "10.1.200.7".parse().unwrap();
/// assert!(net.contains(&host));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NetworkAddress {
    family: AddressFamily,
    bits: u128,
    prefix_len: u8,
}

impl NetworkAddress {
    /// Creates a network from raw bits, clearing everything past the prefix.
    ///
    /// # Errors
    ///
    /// [`AclError::InvalidAddress`] if `prefix_len` exceeds the family width
    /// or `bits` has bits set above the family width.
    pub fn new(family: AddressFamily, bits: u128, prefix_len: u8) -> Result<Self> {
        family.check_prefix(prefix_len)?;
        if bits & !family.full() != 0 {
            return Err(AclError::InvalidAddress(format!(
                "{bits:#x} does not fit in a {family} address"
            )));
        }
        Ok(Self {
            family,
            bits: bits & family.mask(prefix_len),
            prefix_len,
        })
    }

    /// Creates the maximally specific network (`prefix_len == width`) for one address.
    pub fn host(family: AddressFamily, bits: u128) -> Result<Self> {
        Self::new(family, bits, family.width())
    }

    /// Parses an address literal of the given family with a separate prefix length.
    pub fn parse(text: &str, prefix_len: u8, family: AddressFamily) -> Result<Self> {
        family.check_prefix(prefix_len)?;
        let bits = family.parse_bits(text)?;
        Self::new(family, bits, prefix_len)
    }

    /// Parses an address literal with the prefix length given as decimal text.
    pub fn parse_with_mask(text: &str, mask: &str, family: AddressFamily) -> Result<Self> {
        let prefix_len = parse_prefix(mask)?;
        Self::parse(text, prefix_len, family)
    }

    /// Parses an address literal of either family, trying IPv4 syntax first.
    pub fn parse_any(text: &str, prefix_len: u8) -> Result<Self> {
        let (family, bits) = parse_address(text)?;
        Self::new(family, bits, prefix_len)
    }

    /// Parses `address/prefix` text, or a bare address as a host network.
    pub fn parse_cidr(text: &str) -> Result<Self> {
        match text.split_once('/') {
            Some((address, prefix)) => {
                let (family, bits) = parse_address(address)?;
                Self::new(family, bits, parse_prefix(prefix)?)
            }
            None => {
                let (family, bits) = parse_address(text)?;
                Self::host(family, bits)
            }
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Canonical address bits (low `width` bits significant).
    pub fn bits(&self) -> u128 {
        self.bits
    }

    /// The mask selecting the network portion of this address.
    pub fn mask(&self) -> u128 {
        self.family.mask(self.prefix_len)
    }

    /// The network address without its prefix.
    pub fn address(&self) -> IpAddr {
        match self.family {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(self.bits as u32)),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.bits)),
        }
    }

    /// Returns true when this network names a single address.
    pub fn is_host(&self) -> bool {
        self.prefix_len == self.family.width()
    }

    /// Returns true if `other` equals this network or is one of its subnets.
    ///
    /// Networks of different families never contain one another.
    pub fn contains(&self, other: &NetworkAddress) -> bool {
        self.family == other.family
            && other.prefix_len >= self.prefix_len
            && other.bits & self.mask() == self.bits
    }

    /// Returns the network with the shorter prefix `prefix_len` that encloses this one.
    ///
    /// # Errors
    ///
    /// [`AclError::InvalidAddress`] if `prefix_len` is longer than this network's prefix.
    pub fn enclosing(&self, prefix_len: u8) -> Result<Self> {
        if prefix_len > self.prefix_len {
            return Err(AclError::InvalidAddress(format!(
                "network '{self}' cannot be contained in a /{prefix_len} network"
            )));
        }
        Self::new(self.family, self.bits, prefix_len)
    }

    /// Fails with [`AclError::FamilyMismatch`] unless this network is of `expected` family.
    pub fn ensure_family(&self, expected: AddressFamily) -> Result<()> {
        if self.family == expected {
            Ok(())
        } else {
            Err(AclError::FamilyMismatch {
                expected,
                found: self.family,
            })
        }
    }
}

impl Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            AddressFamily::V4 => write_v4(f, self.bits as u32)?,
            AddressFamily::V6 => write_v6(f, self.bits)?,
        }
        write!(f, "/{}", self.prefix_len)
    }
}

impl FromStr for NetworkAddress {
    type Err = AclError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_cidr(s)
    }
}

impl From<Ipv4Addr> for NetworkAddress {
    fn from(addr: Ipv4Addr) -> Self {
        Self {
            family: AddressFamily::V4,
            bits: u128::from(u32::from(addr)),
            prefix_len: AddressFamily::V4.width(),
        }
    }
}

impl From<Ipv6Addr> for NetworkAddress {
    fn from(addr: Ipv6Addr) -> Self {
        Self {
            family: AddressFamily::V6,
            bits: u128::from(addr),
            prefix_len: AddressFamily::V6.width(),
        }
    }
}

impl From<IpAddr> for NetworkAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl Serialize for NetworkAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_cidr(&text).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Literal syntax
// ============================================================================

/// Detects the family of `text` (IPv4 first) and returns its bits.
fn parse_address(text: &str) -> Result<(AddressFamily, u128)> {
    if let Some(bits) = parse_v4(text) {
        return Ok((AddressFamily::V4, u128::from(bits)));
    }
    parse_v6(text)
        .map(|bits| (AddressFamily::V6, bits))
        .ok_or_else(|| AclError::InvalidAddress(format!("'{text}' is not a valid IPv4 or IPv6 address")))
}

fn parse_prefix(text: &str) -> Result<u8> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AclError::InvalidAddress(format!("'{text}' is not a valid prefix length")));
    }
    text.parse::<u8>()
        .map_err(|_| AclError::InvalidAddress(format!("'{text}' is not a valid prefix length")))
}

/// Four dot-separated decimal groups of 1-3 digits, each at most 255.
fn parse_v4(text: &str) -> Option<u32> {
    let mut bits = 0u32;
    let mut groups = 0;
    for group in text.split('.') {
        if groups == 4 || group.is_empty() || group.len() > 3 {
            return None;
        }
        if !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u8 = group.parse().ok()?;
        bits = (bits << 8) | u32::from(octet);
        groups += 1;
    }
    (groups == 4).then_some(bits)
}

/// Colon-separated groups of 1-4 hex digits with at most one `::`.
fn parse_v6(text: &str) -> Option<u128> {
    let mut groups = [0u16; 8];
    match text.split_once("::") {
        None => {
            let count = parse_v6_groups(text, &mut groups)?;
            if count != 8 {
                return None;
            }
        }
        Some((head, tail)) => {
            if tail.contains("::") {
                return None;
            }
            let mut tail_groups = [0u16; 8];
            let head_count = parse_v6_groups(head, &mut groups)?;
            let tail_count = parse_v6_groups(tail, &mut tail_groups)?;
            // `::` stands for at least one zero group
            if head_count + tail_count > 7 {
                return None;
            }
            groups[8 - tail_count..].copy_from_slice(&tail_groups[..tail_count]);
        }
    }
    Some(groups.iter().fold(0u128, |acc, &g| (acc << 16) | u128::from(g)))
}

/// Parses up to eight groups into `out`, returning how many were read.
fn parse_v6_groups(text: &str, out: &mut [u16; 8]) -> Option<usize> {
    if text.is_empty() {
        return Some(0);
    }
    let mut count = 0;
    for group in text.split(':') {
        if count == 8 || group.is_empty() || group.len() > 4 {
            return None;
        }
        if !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        out[count] = u16::from_str_radix(group, 16).ok()?;
        count += 1;
    }
    Some(count)
}

fn write_v4(f: &mut fmt::Formatter<'_>, bits: u32) -> fmt::Result {
    let [a, b, c, d] = bits.to_be_bytes();
    write!(f, "{a}.{b}.{c}.{d}")
}

/// Lower-case hex groups; the longest run of two or more zero groups
/// (leftmost on ties) is written as `::`.
fn write_v6(f: &mut fmt::Formatter<'_>, bits: u128) -> fmt::Result {
    let mut groups = [0u16; 8];
    for (i, group) in groups.iter_mut().enumerate() {
        *group = (bits >> (112 - 16 * i)) as u16;
    }

    let mut best: Option<(usize, usize)> = None;
    let mut run_start = None;
    for i in 0..=8 {
        match (groups.get(i).copied(), run_start) {
            (Some(0), None) => run_start = Some(i),
            (Some(0), Some(_)) => {}
            (_, Some(start)) => {
                let len = i - start;
                if len >= 2 && best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((start, len));
                }
                run_start = None;
            }
            (_, None) => {}
        }
    }

    match best {
        Some((start, len)) => {
            write_groups(f, &groups[..start])?;
            f.write_str("::")?;
            write_groups(f, &groups[start + len..])
        }
        None => write_groups(f, &groups),
    }
}

fn write_groups(f: &mut fmt::Formatter<'_>, groups: &[u16]) -> fmt::Result {
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            f.write_str(":")?;
        }
        write!(f, "{group:x}")?;
    }
    Ok(())
}
