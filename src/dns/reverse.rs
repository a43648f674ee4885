//! Reverse DNS (PTR) lookups

use super::cache::PtrCache;
use super::DnsError;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Look up the PTR hostname of `ip`, without the trailing dot
pub async fn reverse_dns_lookup(resolver: &TokioResolver, ip: IpAddr) -> Result<String, DnsError> {
    let lookup = resolver
        .reverse_lookup(ip)
        .await
        .map_err(|e| DnsError::ResolutionError(e.to_string()))?;

    lookup
        .iter()
        .next()
        .map(|name| name.to_string().trim_end_matches('.').to_string())
        .filter(|name| !name.is_empty())
        .ok_or(DnsError::NotFound)
}

/// PTR lookup that consults and fills `cache`
pub async fn reverse_dns_lookup_with_cache(
    resolver: &TokioResolver,
    ip: IpAddr,
    cache: &RwLock<PtrCache>,
) -> Result<String, DnsError> {
    if let Some(hostname) = cache.read().await.get(&ip) {
        tracing::debug!("PTR cache hit for {ip}: {hostname}");
        return Ok(hostname);
    }

    let hostname = reverse_dns_lookup(resolver, ip).await?;
    cache.write().await.insert(ip, hostname.clone());
    Ok(hostname)
}

/// Create the resolver shared by forward and reverse lookups
pub fn create_default_resolver() -> TokioResolver {
    TokioResolver::builder_with_config(
        ResolverConfig::cloudflare(),
        TokioConnectionProvider::default(),
    )
    .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cached_entry_skips_query() {
        let resolver = create_default_resolver();
        let cache = RwLock::new(PtrCache::new(Duration::from_secs(60)));
        // TEST-NET-1 has no public PTR records, so only the cache can answer
        let ip = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
        cache
            .write()
            .await
            .insert(ip, "lax1.nflxvideo.net".to_string());

        let hostname = reverse_dns_lookup_with_cache(&resolver, ip, &cache)
            .await
            .unwrap();
        assert_eq!(hostname, "lax1.nflxvideo.net");
    }

    #[tokio::test]
    async fn test_private_address_fails_gracefully() {
        let resolver = create_default_resolver();
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        match reverse_dns_lookup(&resolver, ip).await {
            Ok(hostname) => assert!(!hostname.ends_with('.')),
            Err(e) => assert!(matches!(
                e,
                DnsError::ResolutionError(_) | DnsError::NotFound
            )),
        }
    }
}
