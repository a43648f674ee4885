//! ASN and ISP ownership lookups via Team Cymru

use async_trait::async_trait;
use std::net::IpAddr;

pub mod cache;
pub mod lookup;
pub mod service;
pub mod whois;

pub use cache::AsnCache;
pub use service::AsnLookup;
pub use whois::{normalize_asn, parse_whois_response, IspRecord};

/// Error type for ASN lookup operations
#[derive(Debug, thiserror::Error)]
pub enum AsnLookupError {
    /// WHOIS connection or read failed
    #[error("WHOIS query failed: {0}")]
    Whois(#[from] std::io::Error),

    /// WHOIS did not answer within the request timeout
    #[error("WHOIS query timed out")]
    Timeout,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsError(String),

    /// Header and value lines have different field counts
    #[error("WHOIS header has {headers} fields but values have {values}")]
    HeaderMismatch {
        /// Number of header fields
        headers: usize,
        /// Number of value fields
        values: usize,
    },

    /// Invalid response format
    #[error("Invalid ASN response format: {0}")]
    InvalidFormat(String),

    /// Address is private, loopback or otherwise not routed
    #[error("{0} is not a globally routed address")]
    NotRoutable(IpAddr),

    /// No ASN data found
    #[error("No ASN data found")]
    NotFound,
}

/// Source of ISP ownership records
#[async_trait]
pub trait IspLookup: Send + Sync {
    /// Ownership record for `ip`
    async fn lookup(&self, ip: IpAddr) -> Result<IspRecord, AsnLookupError>;
}
