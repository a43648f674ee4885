//! Forward DNS resolution of candidate hostnames

use super::DnsError;
use hickory_resolver::TokioResolver;
use std::fmt;
use std::net::IpAddr;

/// Record type used for a forward lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::A => f.write_str("A"),
            QueryType::Aaaa => f.write_str("AAAA"),
        }
    }
}

/// Pick the record type from the hostname
///
/// Open Connect hostnames carry their address family in the name. Names that
/// mention neither family get an A query.
///
/// # Examples
///
/// ```
/// use oca_locator::dns::forward::{select_query_type, QueryType};
///
/// assert_eq!(select_query_type("ipv6-c001-lax001.oca.nflxvideo.net"), QueryType::Aaaa);
/// assert_eq!(select_query_type("ord1.nflxvideo.net"), QueryType::A);
/// ```
pub fn select_query_type(domain: &str) -> QueryType {
    let lowered = domain.to_ascii_lowercase();
    if lowered.contains("ipv6") {
        QueryType::Aaaa
    } else {
        QueryType::A
    }
}

/// Address family of a textual address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    /// Dotted quad
    V4,
    /// Colon-separated
    V6,
    /// Neither
    Unknown,
}

/// Classify an address by its separators
pub fn classify_address(address: &str) -> AddressFamily {
    if address.contains(':') {
        AddressFamily::V6
    } else if address.contains('.') {
        AddressFamily::V4
    } else {
        AddressFamily::Unknown
    }
}

/// Whether a domain name advertises IPv6 ("ipv6" anywhere, any case)
pub fn is_ipv6_named(domain: &str) -> bool {
    domain.to_ascii_lowercase().contains("ipv6")
}

/// Resolve `domain` to its first address of the selected family
///
/// Address literals are returned as-is without a query.
pub async fn forward_lookup(resolver: &TokioResolver, domain: &str) -> Result<IpAddr, DnsError> {
    if let Ok(ip) = domain.parse::<IpAddr>() {
        return Ok(ip);
    }

    let query_type = select_query_type(domain);
    tracing::debug!("Resolving {domain} ({query_type})");

    let ip = match query_type {
        QueryType::A => resolver
            .ipv4_lookup(domain)
            .await
            .map_err(|e| DnsError::ResolutionError(e.to_string()))?
            .iter()
            .next()
            .map(|a| IpAddr::V4(a.0)),
        QueryType::Aaaa => resolver
            .ipv6_lookup(domain)
            .await
            .map_err(|e| DnsError::ResolutionError(e.to_string()))?
            .iter()
            .next()
            .map(|aaaa| IpAddr::V6(aaaa.0)),
    };

    ip.ok_or(DnsError::NotFound)
}
