//! Conversion of configured address tokens into concrete IPv4 hosts.
//!
//! A token is either a literal address (`10.0.0.1`) or a prefix
//! (`10.0.0.1/32`). Only full-width prefixes name a single host; anything
//! wider, IPv6, or unparsable converts to nothing.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Convert one address token to at most one host address.
pub fn to_host(token: &str) -> Option<Ipv4Addr> {
    let token = token.trim();

    if token.contains('/') {
        let net: Ipv4Net = token.parse().ok()?;
        return (net.prefix_len() == net.max_prefix_len()).then(|| net.addr());
    }

    token.parse().ok()
}

/// Convert a list of address tokens, silently dropping unusable ones.
///
/// Order is preserved.
pub fn to_hosts<S: AsRef<str>>(tokens: &[S]) -> Vec<Ipv4Addr> {
    tokens.iter().filter_map(|t| to_host(t.as_ref())).collect()
}
