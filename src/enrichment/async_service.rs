//! Async enrichment service
//!
//! Every candidate is enriched by its own future: a WHOIS lookup on the
//! candidate's address, then a geolocation query. The futures run together
//! on a `FuturesUnordered`; a panic in one of them leaves that candidate
//! un-enriched and does not disturb the others.

use crate::asn::IspLookup;
use crate::geo::{GeoProvider, NETFLIX_AS_NAME, NETFLIX_ASN};
use crate::locator::types::OcaCandidate;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Concurrent candidate enrichment
#[derive(Clone)]
pub struct EnrichmentService {
    isp: Arc<dyn IspLookup>,
    geo: Arc<dyn GeoProvider>,
}

impl std::fmt::Debug for EnrichmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentService")
            .field("geo", &self.geo.name())
            .finish_non_exhaustive()
    }
}

impl EnrichmentService {
    /// Create a service over an ownership source and a geolocation provider
    pub fn new(isp: Arc<dyn IspLookup>, geo: Arc<dyn GeoProvider>) -> Self {
        Self { isp, geo }
    }

    /// Enrich one candidate
    ///
    /// The ASN comes from WHOIS on the candidate's own address. When that
    /// fails the appliance is assumed to sit in Netflix's network.
    pub async fn enrich_one(&self, mut candidate: OcaCandidate) -> OcaCandidate {
        let (asn, as_name) = match self.isp.lookup(candidate.ip).await {
            Ok(record) => (record.asn, record.as_name),
            Err(e) => {
                tracing::debug!(
                    "ASN lookup for {} failed ({e}), assuming AS{NETFLIX_ASN}",
                    candidate.ip
                );
                (NETFLIX_ASN.to_string(), NETFLIX_AS_NAME.to_string())
            }
        };

        let ip = candidate.ip.to_string();
        candidate.location = self
            .geo
            .resolve(&candidate.domain, Some(&asn), Some(&ip))
            .await;
        if candidate.location.is_none() {
            tracing::info!("No location found for {}", candidate.domain);
        }
        candidate.asn = Some(asn);
        candidate.as_name = Some(as_name);
        candidate
    }

    /// Enrich all candidates concurrently, keeping their input order
    pub async fn enrich_all(&self, candidates: Vec<OcaCandidate>) -> Vec<OcaCandidate> {
        let mut enrichment_futures = FuturesUnordered::new();

        for (index, candidate) in candidates.iter().cloned().enumerate() {
            let service = self.clone();
            enrichment_futures.push(async move {
                let outcome = AssertUnwindSafe(service.enrich_one(candidate))
                    .catch_unwind()
                    .await;
                (index, outcome)
            });
        }

        let mut enriched: Vec<Option<OcaCandidate>> = vec![None; candidates.len()];
        while let Some((index, outcome)) = enrichment_futures.next().await {
            match outcome {
                Ok(candidate) => enriched[index] = Some(candidate),
                Err(_) => tracing::warn!(
                    "Enrichment of {} failed, keeping it un-enriched",
                    candidates[index].domain
                ),
            }
        }

        candidates
            .into_iter()
            .zip(enriched)
            .map(|(original, enriched)| enriched.unwrap_or(original))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn::{AsnLookupError, IspRecord};
    use crate::geo::{GeoSource, LocationRecord};
    use async_trait::async_trait;
    use std::net::IpAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Whois(Option<&'static str>);

    #[async_trait]
    impl IspLookup for Whois {
        async fn lookup(&self, ip: IpAddr) -> Result<IspRecord, AsnLookupError> {
            match self.0 {
                Some(asn) => Ok(IspRecord {
                    asn: asn.to_string(),
                    as_name: "TEST-AS".to_string(),
                    ip: ip.to_string(),
                    ..Default::default()
                }),
                None => Err(AsnLookupError::NotFound),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        asns: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl GeoProvider for Recorder {
        async fn resolve(
            &self,
            domain: &str,
            asn: Option<&str>,
            _ip: Option<&str>,
        ) -> Option<LocationRecord> {
            self.asns.lock().unwrap().push(asn.map(str::to_string));
            if domain.starts_with("panic") {
                panic!("provider blew up");
            }
            if domain.starts_with("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            (!domain.starts_with("unknown"))
                .then(|| LocationRecord::new(GeoSource::Primary).with_iata("ORD").with_city("Chicago, IL"))
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn candidate(domain: &str) -> OcaCandidate {
        let ip: IpAddr = "198.38.96.1".parse().unwrap();
        OcaCandidate::new(domain, ip, format!("https://{domain}/speedtest"))
    }

    #[tokio::test]
    async fn test_whois_failure_assumes_netflix() {
        let geo = Arc::new(Recorder::default());
        let service = EnrichmentService::new(Arc::new(Whois(None)), geo.clone());

        let enriched = service.enrich_one(candidate("ord1.nflxvideo.net")).await;

        assert_eq!(enriched.asn.as_deref(), Some("2906"));
        assert_eq!(enriched.as_name.as_deref(), Some("AS-SSI"));
        assert_eq!(geo.asns.lock().unwrap()[0].as_deref(), Some("2906"));
    }

    #[tokio::test]
    async fn test_candidate_asn_is_used() {
        let geo = Arc::new(Recorder::default());
        let service = EnrichmentService::new(Arc::new(Whois(Some("7018"))), geo.clone());

        let enriched = service.enrich_one(candidate("ord1.nflxvideo.net")).await;

        assert_eq!(enriched.asn.as_deref(), Some("7018"));
        assert_eq!(geo.asns.lock().unwrap()[0].as_deref(), Some("7018"));
    }

    #[tokio::test]
    async fn test_order_is_preserved() {
        let service = EnrichmentService::new(
            Arc::new(Whois(Some("2906"))),
            Arc::new(Recorder::default()),
        );
        let input = vec![candidate("slow1.example"), candidate("fast1.example"), candidate("unknown1.example")];

        let enriched = service.enrich_all(input).await;

        let domains: Vec<&str> = enriched.iter().map(|c| c.domain.as_str()).collect();
        assert_eq!(domains, vec!["slow1.example", "fast1.example", "unknown1.example"]);
        assert!(enriched[0].is_located());
        assert!(!enriched[2].is_located());
        assert_eq!(enriched[2].asn.as_deref(), Some("2906"));
    }

    #[tokio::test]
    async fn test_panicking_candidate_kept_unenriched() {
        let service = EnrichmentService::new(
            Arc::new(Whois(Some("2906"))),
            Arc::new(Recorder::default()),
        );
        let input = vec![candidate("ord1.example"), candidate("panic1.example")];

        let enriched = service.enrich_all(input).await;

        assert_eq!(enriched.len(), 2);
        assert!(enriched[0].is_located());
        assert_eq!(enriched[1].domain, "panic1.example");
        assert!(enriched[1].asn.is_none());
        assert!(enriched[1].location.is_none());
    }
}
