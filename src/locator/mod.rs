//! The locator run: public IP, ISP, token, candidates, enrichment
//!
//! The first four steps run strictly in order since each needs the previous
//! one's output. Enrichment fans out over all candidates.

pub mod error;
pub mod types;

pub use error::LocatorError;
pub use types::{LocatorResult, OcaCandidate};

use crate::asn::{IspLookup, IspRecord};
use crate::enrichment::EnrichmentService;
use crate::fast_com::parse::redact_token;
use crate::fast_com::CandidateSource;
use crate::geo::GeoProvider;
use crate::public_ip::PublicIpSource;
use crate::services::Services;
use chrono::Utc;
use std::sync::Arc;

/// Progress notifications for interactive front ends
pub trait LocatorObserver: Send + Sync {
    /// A pipeline step is starting
    fn step(&self, _description: &str) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentObserver;

impl LocatorObserver for SilentObserver {}

/// Orchestrates one locator run
#[derive(Clone)]
pub struct OcaLocator {
    public_ip: Arc<dyn PublicIpSource>,
    isp: Arc<dyn IspLookup>,
    fast_com: Arc<dyn CandidateSource>,
    enrichment: EnrichmentService,
}

impl std::fmt::Debug for OcaLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcaLocator")
            .field("enrichment", &self.enrichment)
            .finish_non_exhaustive()
    }
}

impl OcaLocator {
    /// Create a locator from individual collaborators
    pub fn new(
        public_ip: Arc<dyn PublicIpSource>,
        isp: Arc<dyn IspLookup>,
        fast_com: Arc<dyn CandidateSource>,
        geo: Arc<dyn GeoProvider>,
    ) -> Self {
        Self {
            public_ip,
            enrichment: EnrichmentService::new(Arc::clone(&isp), geo),
            isp,
            fast_com,
        }
    }

    /// Create a locator from a service container
    pub fn from_services(services: &Services) -> Self {
        Self::new(
            Arc::clone(&services.public_ip),
            services.asn.clone(),
            services.fast_com.clone(),
            Arc::clone(&services.geo),
        )
    }

    /// Run the whole pipeline
    pub async fn locate(&self) -> Result<LocatorResult, LocatorError> {
        self.locate_with(&SilentObserver).await
    }

    /// Run the whole pipeline, reporting progress to `observer`
    pub async fn locate_with(
        &self,
        observer: &dyn LocatorObserver,
    ) -> Result<LocatorResult, LocatorError> {
        let query_time = Utc::now();

        observer.step("Getting public IP address");
        let public_ip = self
            .public_ip
            .public_ip()
            .await
            .map_err(LocatorError::PublicIp)?;
        tracing::info!("Public IP: {public_ip}");

        observer.step("Looking up ISP information");
        let isp = match self.isp.lookup(public_ip).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("ISP lookup for {public_ip} failed: {e}");
                IspRecord::unknown(public_ip)
            }
        };
        tracing::info!("ISP: AS{} {}", isp.asn, isp.as_name);

        observer.step("Getting Fast.com token");
        let token = self.fast_com.token().await.map_err(LocatorError::Token)?;
        tracing::debug!("Using token {}", redact_token(&token));

        observer.step("Fetching OCA candidates");
        let candidates = self
            .fast_com
            .candidates(&token)
            .await
            .map_err(LocatorError::Candidates)?;
        if candidates.is_empty() {
            tracing::warn!("Fast.com returned no candidates");
        }

        observer.step("Resolving OCA locations");
        let candidates = self.enrichment.enrich_all(candidates).await;
        let located = candidates.iter().filter(|c| c.is_located()).count();
        tracing::info!("Located {located} of {} OCAs", candidates.len());

        Ok(LocatorResult::new(public_ip, isp, candidates, token, query_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn::AsnLookupError;
    use crate::fast_com::FastComError;
    use crate::geo::{GeoSource, LocationRecord};
    use crate::public_ip::{FixedPublicIp, PublicIpError};
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::Mutex;

    struct NoPublicIp;

    #[async_trait]
    impl PublicIpSource for NoPublicIp {
        async fn public_ip(&self) -> Result<IpAddr, PublicIpError> {
            Err(PublicIpError::AllProvidersFailed)
        }
    }

    struct FailingIsp;

    #[async_trait]
    impl IspLookup for FailingIsp {
        async fn lookup(&self, _ip: IpAddr) -> Result<IspRecord, AsnLookupError> {
            Err(AsnLookupError::Timeout)
        }
    }

    struct Candidates {
        token: Option<&'static str>,
        domains: Vec<&'static str>,
    }

    #[async_trait]
    impl CandidateSource for Candidates {
        async fn token(&self) -> Result<String, FastComError> {
            self.token.map(str::to_string).ok_or(FastComError::TokenNotFound)
        }

        async fn candidates(&self, _token: &str) -> Result<Vec<OcaCandidate>, FastComError> {
            let ip: IpAddr = "198.38.96.1".parse().unwrap();
            Ok(self
                .domains
                .iter()
                .map(|d| OcaCandidate::new(*d, ip, format!("https://{d}/speedtest")))
                .collect())
        }
    }

    struct Table;

    #[async_trait]
    impl GeoProvider for Table {
        async fn resolve(&self, domain: &str, _asn: Option<&str>, _ip: Option<&str>) -> Option<LocationRecord> {
            domain.starts_with("ord").then(|| {
                LocationRecord::new(GeoSource::Primary)
                    .with_city("Chicago, IL")
                    .with_iata("ORD")
            })
        }

        fn name(&self) -> &'static str {
            "table"
        }
    }

    #[derive(Default)]
    struct Steps(Mutex<Vec<String>>);

    impl LocatorObserver for Steps {
        fn step(&self, description: &str) {
            self.0.lock().unwrap().push(description.to_string());
        }
    }

    fn public_ip() -> Arc<dyn PublicIpSource> {
        Arc::new(FixedPublicIp("203.0.113.7".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_public_ip_failure_is_fatal() {
        let locator = OcaLocator::new(
            Arc::new(NoPublicIp),
            Arc::new(FailingIsp),
            Arc::new(Candidates { token: Some("t"), domains: vec![] }),
            Arc::new(Table),
        );
        assert!(matches!(locator.locate().await, Err(LocatorError::PublicIp(_))));
    }

    #[tokio::test]
    async fn test_token_failure_is_fatal() {
        let locator = OcaLocator::new(
            public_ip(),
            Arc::new(FailingIsp),
            Arc::new(Candidates { token: None, domains: vec![] }),
            Arc::new(Table),
        );
        assert!(matches!(locator.locate().await, Err(LocatorError::Token(_))));
    }

    #[tokio::test]
    async fn test_unlocated_candidates_are_kept() {
        let locator = OcaLocator::new(
            public_ip(),
            Arc::new(FailingIsp),
            Arc::new(Candidates {
                token: Some("token-value"),
                domains: vec!["ord1.nflxvideo.net", "mystery.example"],
            }),
            Arc::new(Table),
        );
        let steps = Steps::default();

        let result = locator.locate_with(&steps).await.unwrap();

        assert_eq!(result.public_ip(), "203.0.113.7".parse::<IpAddr>().unwrap());
        assert!(!result.isp().is_known());
        assert_eq!(result.token(), "token-value");
        assert_eq!(result.total_ocas(), 2);
        assert!(result.candidates()[0].is_located());
        assert!(!result.candidates()[1].is_located());
        assert_eq!(result.candidates()[1].asn.as_deref(), Some("2906"));
        assert_eq!(steps.0.lock().unwrap().len(), 5);
    }
}
