//! IPv4 address arithmetic, CIDR host ranges and address-pool bookkeeping.
//!
//! Addresses convert to and from big-endian `u32`. Adjacent-address helpers
//! wrap modulo 2^32: the address after `255.255.255.255` is `0.0.0.0`.

use crate::errors::{CidrError, PoolError, Result};
use crate::parsers::{CidrParser, Parser};
use log::trace;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;

/// Convert an address to its big-endian integer form
pub fn ipv4_to_u32(addr: Ipv4Addr) -> u32 {
    u32::from_be_bytes(addr.octets())
}

/// Convert a big-endian integer back to an address
pub fn u32_to_ipv4(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value.to_be_bytes())
}

/// The following address, wrapping from `255.255.255.255` to `0.0.0.0`
pub fn next_address(addr: Ipv4Addr) -> Ipv4Addr {
    u32_to_ipv4(ipv4_to_u32(addr).wrapping_add(1))
}

/// The preceding address, wrapping from `0.0.0.0` to `255.255.255.255`
pub fn previous_address(addr: Ipv4Addr) -> Ipv4Addr {
    u32_to_ipv4(ipv4_to_u32(addr).wrapping_sub(1))
}

/// An IPv4 block in CIDR notation, always stored with host bits cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CidrBlock {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl CidrBlock {
    /// Build a block; `prefix_len` is clamped to 32 and host bits are cleared
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Self {
        let prefix_len = prefix_len.min(32);
        let network = u32_to_ipv4(ipv4_to_u32(address) & Self::mask_bits(prefix_len));
        Self {
            network,
            prefix_len,
        }
    }

    fn mask_bits(prefix_len: u8) -> u32 {
        u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0)
    }

    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn netmask(&self) -> Ipv4Addr {
        u32_to_ipv4(Self::mask_bits(self.prefix_len))
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        u32_to_ipv4(ipv4_to_u32(self.network) | !Self::mask_bits(self.prefix_len))
    }

    /// Total number of addresses in the block, network and broadcast included
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_len))
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        ipv4_to_u32(addr) & Self::mask_bits(self.prefix_len) == ipv4_to_u32(self.network)
    }

    /// Usable host range.
    ///
    /// Network and broadcast addresses are excluded. A `/31` is a
    /// point-to-point link where both addresses are usable (RFC 3021), and a
    /// `/32` is the single host it names.
    pub fn host_range(&self) -> AddressRange {
        let network = ipv4_to_u32(self.network);
        let broadcast = ipv4_to_u32(self.broadcast());

        let (first, last) = match self.prefix_len {
            31 | 32 => (network, broadcast),
            _ => (network + 1, broadcast - 1),
        };

        trace!(
            "host range of {}: {} - {}",
            self,
            u32_to_ipv4(first),
            u32_to_ipv4(last)
        );

        AddressRange {
            first: u32_to_ipv4(first),
            last: u32_to_ipv4(last),
        }
    }
}

impl fmt::Display for CidrBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

/// Inclusive range of host addresses; `first <= last` always holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AddressRange {
    first: Ipv4Addr,
    last: Ipv4Addr,
}

impl AddressRange {
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Result<Self> {
        if ipv4_to_u32(first) > ipv4_to_u32(last) {
            return Err(CidrError::InvertedRange { first, last }.into());
        }
        Ok(Self { first, last })
    }

    pub fn first(&self) -> Ipv4Addr {
        self.first
    }

    pub fn last(&self) -> Ipv4Addr {
        self.last
    }

    /// Number of addresses in the range
    pub fn len(&self) -> u64 {
        u64::from(ipv4_to_u32(self.last)) - u64::from(ipv4_to_u32(self.first)) + 1
    }

    /// Always false: a range holds at least its first address
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        (ipv4_to_u32(self.first)..=ipv4_to_u32(self.last)).contains(&ipv4_to_u32(addr))
    }

    pub fn iter(&self) -> impl Iterator<Item = Ipv4Addr> {
        (ipv4_to_u32(self.first)..=ipv4_to_u32(self.last)).map(u32_to_ipv4)
    }
}

/// Usable host range of a CIDR string such as `"192.168.0.0/24"`
pub fn get_host_range(cidr: &str) -> Result<AddressRange> {
    Ok(CidrParser.parse(cidr)?.host_range())
}

/// Allocation bookkeeping for a pool of public addresses
#[derive(Debug, Clone)]
pub struct AddressPool {
    range: AddressRange,
    allocated: BTreeSet<u32>,
}

impl AddressPool {
    pub fn new(range: AddressRange) -> Self {
        Self {
            range,
            allocated: BTreeSet::new(),
        }
    }

    /// Pool over the usable hosts of a CIDR block
    pub fn from_cidr(cidr: &str) -> Result<Self> {
        Ok(Self::new(get_host_range(cidr)?))
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    /// Take the lowest free address
    pub fn allocate(&mut self) -> Result<Ipv4Addr> {
        let first = ipv4_to_u32(self.range.first);
        let last = ipv4_to_u32(self.range.last);

        // Walk the allocated set in order; the first gap is the lowest free address
        let mut candidate = first;
        for &taken in self.allocated.range(first..=last) {
            if taken != candidate {
                break;
            }
            if candidate == last {
                return Err(PoolError::Exhausted.into());
            }
            candidate += 1;
        }

        self.allocated.insert(candidate);
        Ok(u32_to_ipv4(candidate))
    }

    /// Mark a specific address as taken, e.g. one the provider already assigned
    pub fn reserve(&mut self, addr: Ipv4Addr) -> Result<()> {
        if !self.range.contains(addr) {
            return Err(PoolError::OutOfRange(addr).into());
        }
        if !self.allocated.insert(ipv4_to_u32(addr)) {
            return Err(PoolError::AlreadyAllocated(addr).into());
        }
        Ok(())
    }

    pub fn release(&mut self, addr: Ipv4Addr) -> Result<()> {
        if !self.allocated.remove(&ipv4_to_u32(addr)) {
            return Err(PoolError::NotAllocated(addr).into());
        }
        Ok(())
    }

    pub fn is_allocated(&self, addr: Ipv4Addr) -> bool {
        self.allocated.contains(&ipv4_to_u32(addr))
    }

    /// Number of free addresses
    pub fn available(&self) -> u64 {
        self.range.len() - self.allocated.len() as u64
    }
}
