//! Service container for the locator
//!
//! Builds every network-facing component once from a [`LocatorConfig`] and
//! hands them out behind `Arc`s, so the orchestrator and the CLI share one
//! HTTP client per remote concern and one set of caches.

use crate::asn::AsnLookup;
use crate::config::{GeocodingProvider, LocatorConfig};
use crate::dns::service::DnsResolver;
use crate::fast_com::FastComClient;
use crate::geo::{AlephProvider, DomainHeuristicProvider, GeoError, GeoProvider, HybridResolver};
use crate::locator::LocatorError;
use crate::public_ip::{PublicIpClient, PublicIpSource};
use std::sync::Arc;

/// Container for all services used by a locator run
///
/// Services are thread-safe internally, so no outer locking is needed.
///
/// # Examples
///
/// ```no_run
/// use oca_locator::config::LocatorConfig;
/// use oca_locator::services::Services;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let services = Services::new(&LocatorConfig::default())?;
///
///     // Services can be used directly without locking
///     let isp = services.asn.lookup("198.38.96.1".parse()?).await?;
///     println!("AS{} {}", isp.asn, isp.as_name);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Services {
    /// Configuration the services were built from
    pub config: Arc<LocatorConfig>,
    /// Forward and reverse DNS
    pub dns: Arc<DnsResolver>,
    /// ASN lookups for the public IP and every candidate
    pub asn: Arc<AsnLookup>,
    /// Public IP detection
    pub public_ip: Arc<dyn PublicIpSource>,
    /// Fast.com token and candidate listing
    pub fast_com: Arc<FastComClient>,
    /// Geocoding chain selected by `geocoding_provider`
    pub geo: Arc<dyn GeoProvider>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("dns", &self.dns)
            .field("asn", &self.asn)
            .field("fast_com", &self.fast_com)
            .field("geo", &self.geo.name())
            .finish_non_exhaustive()
    }
}

impl Services {
    /// Create every service from `config`
    pub fn new(config: &LocatorConfig) -> Result<Self, LocatorError> {
        let dns = Arc::new(DnsResolver::new());
        let asn = Arc::new(AsnLookup::new(config).with_resolver(dns.resolver()));
        let public_ip = PublicIpClient::new(config).map_err(|e| setup("public IP client", e))?;
        let fast_com =
            FastComClient::new(config, Arc::clone(&dns)).map_err(|e| setup("Fast.com client", e))?;
        let geo = geo_provider(config, Arc::clone(&dns)).map_err(|e| setup("geocoding", e))?;

        Ok(Self {
            config: Arc::new(config.clone()),
            dns,
            asn,
            public_ip: Arc::new(public_ip),
            fast_com: Arc::new(fast_com),
            geo,
        })
    }

    /// Replace the public IP source, e.g. with a fixed address
    ///
    /// # Arguments
    ///
    /// * `source` - Source consulted instead of the HTTP echo services
    pub fn with_public_ip(mut self, source: Arc<dyn PublicIpSource>) -> Self {
        self.public_ip = source;
        self
    }

    /// Number of cached PTR entries and ASN prefixes
    pub async fn cache_sizes(&self) -> (usize, usize) {
        (self.dns.cached_entries().await, self.asn.cached_prefixes())
    }
}

/// Build the geocoding provider named by `config.geocoding_provider`
///
/// The hybrid chain uses `dns` for its PTR workarounds.
pub fn geo_provider(
    config: &LocatorConfig,
    dns: Arc<DnsResolver>,
) -> Result<Arc<dyn GeoProvider>, GeoError> {
    let provider: Arc<dyn GeoProvider> = match config.geocoding_provider {
        GeocodingProvider::Hybrid => Arc::new(HybridResolver::new(
            Arc::new(AlephProvider::new(config)?),
            Arc::new(DomainHeuristicProvider::new(config)?),
            dns,
        )),
        GeocodingProvider::Aleph => Arc::new(AlephProvider::new(config)?),
        GeocodingProvider::Heuristic => Arc::new(DomainHeuristicProvider::new(config)?),
    };
    tracing::debug!("Using {} geocoding", provider.name());
    Ok(provider)
}

fn setup(component: &'static str, err: impl std::fmt::Display) -> LocatorError {
    LocatorError::Setup {
        component,
        reason: err.to_string(),
    }
}
