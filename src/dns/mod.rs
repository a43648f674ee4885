//! Forward and reverse DNS lookups

use async_trait::async_trait;
use std::net::IpAddr;

pub mod cache;
pub mod forward;
pub mod reverse;
pub mod service;

pub use cache::PtrCache;
pub use forward::{classify_address, select_query_type, AddressFamily, QueryType};
pub use reverse::{create_default_resolver, reverse_dns_lookup};
pub use service::DnsResolver;

/// Error type for DNS operations
#[derive(Debug, thiserror::Error)]
pub enum DnsError {
    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    ResolutionError(String),

    /// The query succeeded but returned no usable record
    #[error("No record found")]
    NotFound,
}

/// Source of PTR hostnames
///
/// Failures are "no hostname"; PTR lookups are never retried.
#[async_trait]
pub trait PtrLookup: Send + Sync {
    /// PTR hostname of `ip`, if one could be found
    async fn ptr(&self, ip: IpAddr) -> Option<String>;
}
