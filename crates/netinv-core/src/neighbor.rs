//! Neighbor-table text parsing.
//!
//! Turns the loosely structured output of `ip neigh`, BSD-style `arp -an`
//! and Windows `arp -a` into normalized [`NeighborObservation`]s. Rows that do
//! not validate are skipped and counted, never reported as errors: a single
//! garbled line must not cost the rest of the table.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::str::Lines;

use crate::subnet::parse_dotted_quad;
use crate::types::{NeighborObservation, SeenVia};

/// IP → observation, ordered by address.
pub type NeighborMap = BTreeMap<Ipv4Addr, NeighborObservation>;

/// Which text dialect a neighbor table was captured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformHint {
    /// iproute2 `ip neigh`: `10.0.0.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE`
    LinuxNeigh,
    /// BSD/macOS (and net-tools) `arp -an`: `? (10.0.0.1) at aa:bb:cc:dd:ee:ff on en0`
    BsdArp,
    /// Windows `arp -a`: `  10.0.0.1    aa-bb-cc-dd-ee-ff    dynamic`
    WindowsArp,
}

impl PlatformHint {
    /// The primary dialect for the platform this binary was built for.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::WindowsArp
        } else if cfg!(target_os = "linux") {
            Self::LinuxNeigh
        } else {
            Self::BsdArp
        }
    }

    /// Provenance tag for rows parsed in this dialect.
    pub fn source(&self) -> SeenVia {
        match self {
            Self::LinuxNeigh => SeenVia::Neigh,
            Self::BsdArp | Self::WindowsArp => SeenVia::Arp,
        }
    }
}

/// A fully parsed neighbor table.
#[derive(Debug, Clone, Default)]
pub struct NeighborTable {
    pub entries: NeighborMap,
    /// Rows that looked like data but failed validation.
    pub skipped: usize,
}

impl NeighborTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a whole table into one observation per IP.
///
/// Later rows win for the same IP, except that an unresolved row (no MAC)
/// never displaces a resolved one.
pub fn parse_neighbor_table(raw: &str, hint: PlatformHint) -> NeighborTable {
    let mut rows = NeighborRows::new(raw, hint);
    let mut entries = NeighborMap::new();

    for obs in rows.by_ref() {
        let keeps_known_mac =
            obs.mac.is_none() && entries.get(&obs.ip).is_some_and(|e| e.mac.is_some());
        if !keeps_known_mac {
            entries.insert(obs.ip, obs);
        }
    }

    NeighborTable {
        entries,
        skipped: rows.skipped(),
    }
}

/// Lazy row-by-row parser over raw table text.
pub struct NeighborRows<'a> {
    lines: Lines<'a>,
    hint: PlatformHint,
    skipped: usize,
}

impl<'a> NeighborRows<'a> {
    pub fn new(raw: &'a str, hint: PlatformHint) -> Self {
        Self {
            lines: raw.lines(),
            hint,
            skipped: 0,
        }
    }

    /// Rows rejected so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for NeighborRows<'_> {
    type Item = NeighborObservation;

    fn next(&mut self) -> Option<Self::Item> {
        for line in self.lines.by_ref() {
            match classify_line(line, self.hint) {
                Line::Row(obs) => return Some(obs),
                Line::Noise => {}
                Line::Rejected => {
                    self.skipped += 1;
                    tracing::trace!(line = %line.trim(), "Skipping neighbor table row");
                }
            }
        }
        None
    }
}

enum Line {
    Row(NeighborObservation),
    Noise,
    Rejected,
}

fn classify_line(line: &str, hint: PlatformHint) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Noise;
    }
    match hint {
        PlatformHint::LinuxNeigh => parse_ip_neigh(line),
        PlatformHint::BsdArp => parse_bsd_arp(line),
        PlatformHint::WindowsArp => parse_windows_arp(line),
    }
}

fn parse_ip_neigh(line: &str) -> Line {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Line::Rejected;
    }
    let Some(ip) = parse_dotted_quad(fields[0]) else {
        return Line::Rejected;
    };

    // FAILED / INCOMPLETE entries carry no lladdr.
    let mac = match fields.iter().position(|f| *f == "lladdr") {
        None => None,
        Some(idx) => match fields.get(idx + 1).and_then(|m| normalize_mac(m)) {
            Some(mac) => Some(mac),
            None => return Line::Rejected,
        },
    };

    Line::Row(NeighborObservation {
        ip,
        mac,
        source: SeenVia::Neigh,
    })
}

fn parse_bsd_arp(line: &str) -> Line {
    let (Some(open), Some(close)) = (line.find('('), line.find(')')) else {
        return Line::Rejected;
    };
    if close < open {
        return Line::Rejected;
    }
    let Some(ip) = parse_dotted_quad(&line[open + 1..close]) else {
        return Line::Rejected;
    };

    let rest = &line[close + 1..];
    let Some(at) = rest.find(" at ") else {
        return Line::Rejected;
    };
    let Some(mac) = rest[at + 4..]
        .split_whitespace()
        .next()
        .and_then(normalize_mac)
    else {
        return Line::Rejected;
    };

    Line::Row(NeighborObservation {
        ip,
        mac: Some(mac),
        source: SeenVia::Arp,
    })
}

fn parse_windows_arp(line: &str) -> Line {
    let lower = line.to_ascii_lowercase();
    if lower.starts_with("interface:") || lower.starts_with("internet address") {
        return Line::Noise;
    }

    let mut fields = line.split_whitespace();
    let (Some(ip), Some(mac)) = (fields.next(), fields.next()) else {
        return Line::Rejected;
    };
    let (Some(ip), Some(mac)) = (parse_dotted_quad(ip), normalize_mac(mac)) else {
        return Line::Rejected;
    };

    Line::Row(NeighborObservation {
        ip,
        mac: Some(mac),
        source: SeenVia::Arp,
    })
}

/// Normalize a MAC to lowercase, colon-separated, zero-padded octets.
///
/// Accepts `:` or `-` as the delimiter (not mixed) and one or two hex
/// digits per octet, as printed by macOS `arp`.
pub fn normalize_mac(raw: &str) -> Option<String> {
    let delimiter = if raw.contains('-') { '-' } else { ':' };
    let octets: Vec<&str> = raw.split(delimiter).collect();
    if octets.len() != 6 {
        return None;
    }

    let mut normalized = String::with_capacity(17);
    for (i, octet) in octets.iter().enumerate() {
        if octet.is_empty() || octet.len() > 2 || !octet.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        if i > 0 {
            normalized.push(':');
        }
        if octet.len() == 1 {
            normalized.push('0');
        }
        normalized.push_str(&octet.to_ascii_lowercase());
    }
    Some(normalized)
}
