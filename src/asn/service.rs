//! ASN lookup service
//!
//! WHOIS first, DNS TXT when WHOIS is unreachable, with results cached by
//! announced prefix. Lookups are never retried.

use super::cache::AsnCache;
use super::lookup::lookup_asn_dns;
use super::whois::{parse_whois_response, query_whois, IspRecord};
use super::{AsnLookupError, IspLookup};
use crate::config::defaults::WHOIS_PORT;
use crate::config::LocatorConfig;
use crate::dns::create_default_resolver;
use async_trait::async_trait;
use hickory_resolver::TokioResolver;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// ASN (Autonomous System Number) lookup service
///
/// # Examples
///
/// ```no_run
/// use oca_locator::asn::service::AsnLookup;
/// use oca_locator::config::LocatorConfig;
/// use std::net::IpAddr;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let asn_service = AsnLookup::new(&LocatorConfig::default());
///
///     let ip: IpAddr = "198.38.96.1".parse()?;
///     let record = asn_service.lookup(ip).await?;
///
///     println!("AS{}: {}", record.asn, record.as_name);
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AsnLookup {
    whois_host: String,
    whois_port: u16,
    timeout: Duration,
    resolver: Option<Arc<TokioResolver>>,
    cache: AsnCache,
}

impl AsnLookup {
    /// Create a service from the locator configuration
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            whois_host: config.cymru_whois_host.clone(),
            whois_port: WHOIS_PORT,
            timeout: config.request_timeout,
            resolver: None,
            cache: AsnCache::new(),
        }
    }

    /// Use a specific resolver for the DNS TXT fallback
    ///
    /// # Arguments
    ///
    /// * `resolver` - DNS resolver to use for TXT queries
    pub fn with_resolver(mut self, resolver: Arc<TokioResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Query a WHOIS server on a non-standard port
    pub fn with_whois_port(mut self, port: u16) -> Self {
        self.whois_port = port;
        self
    }

    /// Share a pre-populated prefix cache
    pub fn with_cache(mut self, cache: AsnCache) -> Self {
        self.cache = cache;
        self
    }

    /// Look up ownership of `ip`
    ///
    /// Checks the prefix cache, then WHOIS, then the DNS TXT interface.
    pub async fn lookup(&self, ip: IpAddr) -> Result<IspRecord, AsnLookupError> {
        if !is_routable(&ip) {
            return Err(AsnLookupError::NotRoutable(ip));
        }

        if let Some(cached) = self.cache.get(&ip) {
            tracing::debug!("ASN cache hit for {ip}: AS{}", cached.asn);
            return Ok(cached);
        }

        let record = match self.lookup_whois(ip).await {
            Ok(record) => record,
            Err(e @ (AsnLookupError::HeaderMismatch { .. } | AsnLookupError::NotFound)) => {
                return Err(e);
            }
            Err(e) => {
                tracing::debug!("WHOIS lookup for {ip} failed ({e}), trying DNS");
                let resolver = match &self.resolver {
                    Some(r) => Arc::clone(r),
                    None => Arc::new(create_default_resolver()),
                };
                lookup_asn_dns(&resolver, ip).await?
            }
        };

        self.cache.insert(&record);
        Ok(record)
    }

    async fn lookup_whois(&self, ip: IpAddr) -> Result<IspRecord, AsnLookupError> {
        let raw = query_whois(&self.whois_host, self.whois_port, ip, self.timeout).await?;
        let mut record = parse_whois_response(&raw)?;
        if record.ip.is_empty() {
            record.ip = ip.to_string();
        }
        Ok(record)
    }

    /// Number of cached prefixes
    pub fn cached_prefixes(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl IspLookup for AsnLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<IspRecord, AsnLookupError> {
        AsnLookup::lookup(self, ip).await
    }
}

/// Whether Team Cymru could know anything about `ip`
pub fn is_routable(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let cgnat = v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64;
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_unspecified()
                || cgnat)
        }
        IpAddr::V6(v6) => {
            let unique_local = (v6.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}
