//! Single-entry predicates for alias content.

use std::net::IpAddr;

use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;

static HOSTNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:[a-zA-Z0-9_]|[a-zA-Z0-9_][a-zA-Z0-9_\-]*[a-zA-Z0-9_])\.)*(?:[a-zA-Z0-9_]|[a-zA-Z0-9_][a-zA-Z0-9_\-]*[a-zA-Z0-9_])$",
    )
    .expect("valid hostname regex")
});

static MAC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("valid mac regex"));

static DYNIPV6_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^::([0-9a-fA-F]{1,4}:){0,3}[0-9a-fA-F]{1,4}$").expect("valid ipv6 suffix regex")
});

/// Highest ASN accepted for `bgpasn` aliases.
///
/// Predates 4-byte AS numbers (up to 4294967295); kept to match what the
/// appliance UI accepts for this alias type.
pub const MAX_BGP_ASN: u64 = 432_775;

fn strip_negation(entry: &str) -> &str {
    entry.strip_prefix('!').unwrap_or(entry)
}

/// Hostname, IPv4/IPv6 address, or a `from-to` address range.
pub fn is_host(entry: &str) -> bool {
    let candidate = strip_negation(entry);
    if let Some((from, to)) = candidate.split_once('-') {
        if from.parse::<IpAddr>().is_ok() && to.parse::<IpAddr>().is_ok() {
            return true;
        }
    }
    if candidate.parse::<IpAddr>().is_ok() {
        return true;
    }
    // Dotted all-numeric names are addresses, and this one failed to parse.
    if candidate.split('.').all(|label| label.chars().all(|c| c.is_ascii_digit())) {
        return false;
    }
    HOSTNAME.is_match(candidate)
}

/// CIDR network; host bits may be set. A bare address counts as a host network.
pub fn is_network(entry: &str) -> bool {
    let candidate = strip_negation(entry);
    candidate.parse::<IpNet>().is_ok() || candidate.parse::<IpAddr>().is_ok()
}

/// Port `1..=65535` or a `from:to` range of two such ports. No negation.
pub fn is_port(entry: &str) -> bool {
    match entry.split_once(':') {
        Some((from, to)) => is_single_port(from) && is_single_port(to),
        None => is_single_port(entry),
    }
}

fn is_single_port(value: &str) -> bool {
    if value.is_empty() || value.starts_with('0') || !value.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    value.parse::<u32>().is_ok_and(|port| (1..=65535).contains(&port))
}

/// Six colon-separated hex pairs.
pub fn is_mac(entry: &str) -> bool {
    MAC.is_match(strip_negation(entry))
}

pub fn is_bgp_asn(entry: &str) -> bool {
    let candidate = strip_negation(entry);
    if candidate.is_empty()
        || candidate.starts_with('0')
        || !candidate.chars().all(|c| c.is_ascii_digit())
    {
        return false;
    }
    candidate
        .parse::<u64>()
        .is_ok_and(|asn| (1..=MAX_BGP_ASN).contains(&asn))
}

/// Interface-relative IPv6 host part such as `::1000` or `::a:b:c:d`.
pub fn is_dynipv6_host(entry: &str) -> bool {
    DYNIPV6_HOST.is_match(entry)
}

#[cfg(test)]
mod tests {
    use super::{is_bgp_asn, is_dynipv6_host, is_host, is_mac, is_network, is_port};

    #[test]
    fn port_boundaries() {
        assert!(!is_port("0"));
        assert!(is_port("1"));
        assert!(is_port("65535"));
        assert!(!is_port("65536"));
        assert!(is_port("80:80"));
        assert!(is_port("1024:65535"));
        assert!(!is_port("!80"));
        assert!(!is_port("080"));
        assert!(!is_port("80:"));
        assert!(!is_port("http"));
    }

    #[test]
    fn hosts_accept_names_addresses_and_ranges() {
        assert!(is_host("!10.0.0.1"));
        assert!(is_host("TestHost"));
        assert!(is_host("www.example.org"));
        assert!(is_host("_srv.example"));
        assert!(is_host("8.8.8.8-9.9.9.9"));
        assert!(is_host("2001:db8::1"));
        assert!(!is_host("256.1.1.1"));
        assert!(!is_host("10.0.0.0/24"));
        assert!(!is_host("-leading.example"));
        assert!(!is_host("bad..example"));
    }

    #[test]
    fn networks_allow_host_bits() {
        assert!(is_network("10.0.0.0/24"));
        assert!(is_network("10.0.0.1/24"));
        assert!(is_network("!192.168.0.0/16"));
        assert!(is_network("2001:db8::/32"));
        assert!(is_network("192.168.0.0"));
        assert!(!is_network("10.0.0.0/33"));
        assert!(!is_network("example.org"));
    }

    #[test]
    fn mac_requires_six_octets() {
        assert!(!is_mac("FF:FF:FF:FF:FF"));
        assert!(is_mac("FF:FF:FF:FF:FF:FF"));
        assert!(is_mac("!00:1a:2b:3c:4d:5e"));
        assert!(!is_mac("GG:FF:FF:FF:FF:FF"));
    }

    #[test]
    fn bgp_asn_bounds() {
        assert!(is_bgp_asn("1"));
        assert!(is_bgp_asn("!65000"));
        assert!(is_bgp_asn("432775"));
        assert!(!is_bgp_asn("432776"));
        assert!(!is_bgp_asn("0"));
        assert!(!is_bgp_asn("AS65000"));
    }

    #[test]
    fn dynipv6_host_suffixes() {
        assert!(is_dynipv6_host("::1000"));
        assert!(is_dynipv6_host("::a:b:c:d"));
        assert!(!is_dynipv6_host("::a:b:c:d:e"));
        assert!(!is_dynipv6_host("2001::1"));
        assert!(!is_dynipv6_host("::"));
    }
}
