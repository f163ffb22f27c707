//! CIDR-bounded address space.
//!
//! A [`Subnet`] is only constructed through [`Subnet::parse`], which enforces
//! the scan policy: prefixes between /8 and /30 and at most
//! [`MAX_SCAN_HOSTS`] usable hosts. Anything else is rejected outright rather
//! than truncated.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use ipnet::Ipv4Net;

use crate::error::{InventoryError, Result};

/// Smallest prefix accepted for scanning.
pub const MIN_PREFIX: u32 = 8;

/// Largest prefix accepted for scanning. /31 and /32 have no usable hosts.
pub const MAX_PREFIX: u32 = 30;

/// Upper bound on the number of usable hosts in a scannable subnet.
pub const MAX_SCAN_HOSTS: u64 = 4096;

/// A validated IPv4 subnet that is safe to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    net: Ipv4Net,
}

impl Subnet {
    /// Parse and validate `<dotted-quad>/<prefix>`.
    ///
    /// Host bits in the base address are ignored: `192.168.1.77/24` is the
    /// same subnet as `192.168.1.0/24`.
    pub fn parse(cidr: &str) -> Result<Self> {
        let invalid = || InventoryError::InvalidFormat {
            input: cidr.to_string(),
        };

        let (addr, prefix) = cidr.trim().split_once('/').ok_or_else(invalid)?;
        let base = parse_dotted_quad(addr).ok_or_else(invalid)?;
        if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let prefix: u32 = prefix.parse().map_err(|_| invalid())?;

        if !(MIN_PREFIX..=MAX_PREFIX).contains(&prefix) {
            return Err(InventoryError::PrefixOutOfRange { prefix });
        }

        let hosts = usable_hosts(prefix);
        if hosts > MAX_SCAN_HOSTS {
            return Err(InventoryError::RangeTooLarge {
                hosts,
                limit: MAX_SCAN_HOSTS,
            });
        }

        let net = Ipv4Net::new(base, prefix as u8)
            .map_err(|_| invalid())?
            .trunc();
        Ok(Self { net })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.net.network()
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        self.net.broadcast()
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    /// First usable host (network + 1).
    pub fn first_host(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.network()) + 1)
    }

    /// Last usable host (broadcast - 1).
    pub fn last_host(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.broadcast()) - 1)
    }

    /// Number of usable hosts, excluding network and broadcast.
    pub fn host_count(&self) -> usize {
        usable_hosts(u32::from(self.prefix_len())) as usize
    }

    /// Whether `ip` is a usable host of this subnet.
    pub fn contains_host(&self, ip: Ipv4Addr) -> bool {
        (self.first_host()..=self.last_host()).contains(&ip)
    }

    /// Usable hosts in ascending numeric order.
    pub fn hosts(&self) -> impl Iterator<Item = Ipv4Addr> {
        let start = u32::from(self.first_host());
        let end = u32::from(self.last_host());
        (start..=end).map(Ipv4Addr::from)
    }
}

/// Collect every usable host of `subnet`, ascending.
///
/// The host cap keeps this small enough to hold in memory.
pub fn enumerate(subnet: &Subnet) -> Vec<Ipv4Addr> {
    subnet.hosts().collect()
}

impl FromStr for Subnet {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}

fn usable_hosts(prefix: u32) -> u64 {
    (1u64 << (32 - prefix)).saturating_sub(2)
}

/// Strict dotted-quad: exactly four decimal octets, each in 0..=255.
pub(crate) fn parse_dotted_quad(s: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = s.split('.');
    for octet in octets.iter_mut() {
        let part = parts.next()?;
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse::<u16>().ok().filter(|v| *v <= 255)? as u8;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(Ipv4Addr::from(octets))
}
