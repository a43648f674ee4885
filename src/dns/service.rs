//! DNS resolution service
//!
//! Wraps one shared resolver and a PTR cache behind a service-oriented API.

use super::cache::PtrCache;
use super::forward::forward_lookup;
use super::reverse::{create_default_resolver, reverse_dns_lookup_with_cache};
use super::{DnsError, PtrLookup};
use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Forward and reverse DNS lookups with a PTR cache
///
/// # Examples
///
/// ```no_run
/// use oca_locator::dns::service::DnsResolver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dns = DnsResolver::new();
///
///     let ip = dns.resolve("ord1.nflxvideo.net").await?;
///     let ptr = dns.reverse(ip).await?;
///     println!("{ip} -> {ptr}");
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct DnsResolver {
    resolver: Arc<TokioResolver>,
    cache: Arc<RwLock<PtrCache>>,
}

impl DnsResolver {
    /// Create a resolver with the default PTR cache TTL
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(create_default_resolver()))
    }

    /// Use a specific resolver
    ///
    /// # Arguments
    ///
    /// * `resolver` - DNS resolver to use for queries
    pub fn with_resolver(resolver: Arc<TokioResolver>) -> Self {
        Self {
            resolver,
            cache: Arc::new(RwLock::new(PtrCache::default())),
        }
    }

    /// Replace the PTR cache with one using `ttl`
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.cache = Arc::new(RwLock::new(PtrCache::new(ttl)));
        self
    }

    /// Underlying resolver, for sharing with other DNS consumers
    pub fn resolver(&self) -> Arc<TokioResolver> {
        Arc::clone(&self.resolver)
    }

    /// Resolve a hostname, picking A or AAAA from the name
    pub async fn resolve(&self, domain: &str) -> Result<IpAddr, DnsError> {
        forward_lookup(&self.resolver, domain).await
    }

    /// PTR hostname of `ip`
    pub async fn reverse(&self, ip: IpAddr) -> Result<String, DnsError> {
        reverse_dns_lookup_with_cache(&self.resolver, ip, &self.cache).await
    }

    /// Number of cached PTR entries
    pub async fn cached_entries(&self) -> usize {
        self.cache.read().await.len()
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PtrLookup for DnsResolver {
    async fn ptr(&self, ip: IpAddr) -> Option<String> {
        match self.reverse(ip).await {
            Ok(hostname) => Some(hostname),
            Err(e) => {
                tracing::debug!("PTR lookup for {ip} failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_literal() {
        let dns = DnsResolver::new();
        let ip = dns.resolve("2a00:86c0:2040::1").await.unwrap();
        assert!(ip.is_ipv6());
        assert_eq!(dns.cached_entries().await, 0);
    }

    #[tokio::test]
    async fn test_resolve_invalid_name_fails() {
        let dns = DnsResolver::new();
        assert!(dns.resolve("no-such-host.invalid").await.is_err());
    }
}
