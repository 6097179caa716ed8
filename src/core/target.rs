// src/core/target.rs

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::error::ReconError;

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9_-]{0,61}[a-z0-9])?\.)*[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$")
        .expect("hostname regex is valid")
});

static DOTTED_QUAD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").expect("dotted quad regex is valid"));

/// A validated host under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Ip(IpAddr),
    Domain(String),
}

impl Target {
    /// Parses an address literal or DNS name. Names are lowercased and a trailing dot is
    /// dropped. No network access happens here.
    pub fn parse(input: &str) -> Result<Self, ReconError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ReconError::validation("Target is required"));
        }
        let unbracketed = trimmed.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = unbracketed.parse::<IpAddr>() {
            return Ok(Target::Ip(ip));
        }

        let name = trimmed.trim_end_matches('.').to_ascii_lowercase();
        if name.len() > 253 || !HOSTNAME_RE.is_match(&name) {
            return Err(ReconError::validation(format!("Invalid host name: {}", trimmed)));
        }
        // A name made only of digits and dots is a malformed address, not a host name.
        if name.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
            return Err(ReconError::validation(format!("Invalid IP address: {}", trimmed)));
        }
        Ok(Target::Domain(name))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Ip(ip) => write!(f, "{}", ip),
            Target::Domain(name) => write!(f, "{}", name),
        }
    }
}

/// Validates the dotted IPv4 form accepted by the reputation check.
pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, ReconError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ReconError::validation("IP address is required"));
    }
    if !DOTTED_QUAD_RE.is_match(trimmed) {
        return Err(ReconError::validation("Invalid IP address format"));
    }
    trimmed
        .parse::<Ipv4Addr>()
        .map_err(|_| ReconError::validation("Invalid IP address format"))
}

/// True for addresses that are not routable on the public internet and therefore have
/// no meaningful public reputation: RFC 1918, loopback, link-local, 0.0.0.0/8,
/// carrier-grade NAT, multicast, 240.0.0.0/4 (broadcast included) and the IPv6
/// equivalents.
///
/// Documentation ranges (TEST-NET) are deliberately not included.
pub fn is_private_or_reserved(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_multicast()
                || a == 0
                || a >= 240
                || (a == 100 && (b & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6
                    .to_ipv4_mapped()
                    .is_some_and(|v4| is_private_or_reserved(&IpAddr::V4(v4)))
        }
    }
}
