//! Hybrid geolocation resolver
//!
//! Composes a primary provider (TheAleph), a secondary provider (domain
//! heuristics) and a PTR source into one ordered fallback chain:
//!
//! 1. Hostnames mentioning "ipv6" take the IPv6 path, everything else the
//!    standard path.
//! 2. Standard path: ask the primary provider with the caller's ASN, then once
//!    more with Netflix's ASN unless that is what the caller gave.
//! 3. IPv6 path: Open Connect "ipv6" hostnames sometimes resolve to IPv4
//!    (NAT64), and the primary provider rejects IPv6 literals. Either way the
//!    address's PTR name is tried in place of the hostname before the
//!    hostname itself is retried.
//! 4. Anything still unresolved goes to the secondary provider with the
//!    hostname alone.
//!
//! The chain stops at the first record passing [`LocationRecord::is_good`].

use super::location::is_good_result;
use super::{FallbackAnnotations, GeoProvider, GeoSource, LocationRecord, NETFLIX_ASN};
use crate::dns::forward::{classify_address, is_ipv6_named, AddressFamily};
use crate::dns::PtrLookup;
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;

/// Fallback chain over a primary and a secondary provider
#[derive(Clone)]
pub struct HybridResolver {
    primary: Arc<dyn GeoProvider>,
    secondary: Arc<dyn GeoProvider>,
    ptr: Arc<dyn PtrLookup>,
}

impl std::fmt::Debug for HybridResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridResolver")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .finish_non_exhaustive()
    }
}

impl HybridResolver {
    /// Create a resolver
    ///
    /// # Arguments
    ///
    /// * `primary` - Provider tried first, with ASN and address
    /// * `secondary` - Provider tried last, with the hostname only
    /// * `ptr` - PTR source for the IPv6 and NAT64 workarounds
    pub fn new(
        primary: Arc<dyn GeoProvider>,
        secondary: Arc<dyn GeoProvider>,
        ptr: Arc<dyn PtrLookup>,
    ) -> Self {
        Self {
            primary,
            secondary,
            ptr,
        }
    }

    /// Primary provider with the given ASN, then with Netflix's ASN
    async fn standard_path(
        &self,
        domain: &str,
        asn: Option<&str>,
        ip: Option<&str>,
    ) -> Option<LocationRecord> {
        let first = self.primary.resolve(domain, asn, ip).await;
        if is_good_result(first.as_ref()) {
            tracing::debug!("{domain}: primary provider answered with ASN {asn:?}");
            return first.map(|r| r.with_provider(GeoSource::Primary));
        }

        if asn.map(str::trim) == Some(NETFLIX_ASN) {
            return None;
        }

        tracing::debug!("{domain}: retrying primary provider with ASN {NETFLIX_ASN}");
        let retry = self.primary.resolve(domain, Some(NETFLIX_ASN), ip).await;
        if is_good_result(retry.as_ref()) {
            tracing::debug!("{domain}: primary provider answered with ASN {NETFLIX_ASN}");
            return retry.map(|r| r.with_provider(GeoSource::Primary));
        }
        None
    }

    /// PTR name of `address` if it is usable as a primary-provider query
    async fn usable_ptr(&self, address: &str) -> Option<String> {
        let ip: IpAddr = address.parse().ok()?;
        let hostname = self.ptr.ptr(ip).await?;
        let hostname = hostname.trim().trim_end_matches('.');
        (!hostname.is_empty() && !hostname.contains(':')).then(|| hostname.to_string())
    }

    /// Workarounds for hostnames that mention "ipv6"
    async fn ipv6_named_path(
        &self,
        domain: &str,
        asn: Option<&str>,
        ip: Option<&str>,
    ) -> Option<LocationRecord> {
        let address = ip.map(str::trim).filter(|s| !s.is_empty())?;

        match classify_address(address) {
            AddressFamily::V4 => {
                tracing::debug!("{domain}: IPv6 hostname resolved to IPv4 {address}, NAT64 suspected");
                let ptr = self.usable_ptr(address).await;
                let query_domain = ptr.as_deref().unwrap_or(domain);
                let record = self.standard_path(query_domain, asn, Some(address)).await?;
                Some(record.with_annotations(FallbackAnnotations {
                    ipv6_workaround: false,
                    nat64_detected: true,
                    original_domain: Some(domain.to_string()),
                    original_ip: Some(address.to_string()),
                    ptr_domain: ptr,
                }))
            }
            AddressFamily::V6 => {
                tracing::debug!("{domain}: querying without IPv6 literal {address}");
                let ptr = self.usable_ptr(address).await;
                let query_domain = ptr.as_deref().unwrap_or(domain);
                let record = self.standard_path(query_domain, asn, Some("")).await?;
                Some(record.with_annotations(FallbackAnnotations {
                    ipv6_workaround: true,
                    nat64_detected: false,
                    original_domain: Some(domain.to_string()),
                    original_ip: Some(address.to_string()),
                    ptr_domain: ptr,
                }))
            }
            AddressFamily::Unknown => {
                tracing::debug!("{domain}: unrecognised address {address:?}");
                None
            }
        }
    }

    /// Secondary provider with the hostname alone
    async fn fallback(&self, domain: &str) -> Option<LocationRecord> {
        tracing::debug!("{domain}: falling back to {}", self.secondary.name());
        let record = self.secondary.resolve(domain, None, None).await;
        if record.is_none() {
            tracing::debug!("{domain}: no location from any provider");
        }
        record.map(|r| r.with_provider(GeoSource::Fallback))
    }
}

#[async_trait]
impl GeoProvider for HybridResolver {
    async fn resolve(
        &self,
        domain: &str,
        asn: Option<&str>,
        ip: Option<&str>,
    ) -> Option<LocationRecord> {
        let resolved = if is_ipv6_named(domain) {
            self.ipv6_named_path(domain, asn, ip).await
        } else {
            self.standard_path(domain, asn, ip).await
        };

        match resolved {
            Some(record) => Some(record),
            None => self.fallback(domain).await,
        }
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Call = (String, Option<String>, Option<String>);
    type Answer = Box<dyn Fn(&str, Option<&str>) -> Option<LocationRecord> + Send + Sync>;

    struct Scripted {
        answer: Answer,
        calls: Mutex<Vec<Call>>,
    }

    impl Scripted {
        fn new(answer: Answer) -> Arc<Self> {
            Arc::new(Self {
                answer,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GeoProvider for Scripted {
        async fn resolve(
            &self,
            domain: &str,
            asn: Option<&str>,
            ip: Option<&str>,
        ) -> Option<LocationRecord> {
            self.calls.lock().unwrap().push((
                domain.to_string(),
                asn.map(str::to_string),
                ip.map(str::to_string),
            ));
            (self.answer)(domain, asn)
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    struct FixedPtr(Option<&'static str>);

    #[async_trait]
    impl PtrLookup for FixedPtr {
        async fn ptr(&self, _ip: IpAddr) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn chicago() -> LocationRecord {
        LocationRecord::new(GeoSource::Primary)
            .with_city("Chicago, IL")
            .with_iata("ORD")
    }

    fn nothing() -> Answer {
        Box::new(|_, _| None)
    }

    #[tokio::test]
    async fn test_good_first_answer_skips_asn_retry() {
        let primary = Scripted::new(Box::new(|_, _| Some(chicago())));
        let secondary = Scripted::new(nothing());
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(None)),
        );

        let record = resolver
            .resolve("ord1.nflxvideo.net", Some("7018"), Some("198.38.96.1"))
            .await
            .unwrap();

        assert_eq!(record.provider(), GeoSource::Primary);
        assert_eq!(primary.calls().len(), 1);
        assert!(secondary.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_asn_retry_for_netflix_asn() {
        let primary = Scripted::new(nothing());
        let secondary = Scripted::new(nothing());
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(None)),
        );

        let record = resolver
            .resolve("unknown.example", Some("2906"), Some("198.38.96.1"))
            .await;

        assert!(record.is_none());
        assert_eq!(primary.calls().len(), 1);
        assert_eq!(secondary.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_primary_answer_is_not_accepted() {
        let primary = Scripted::new(Box::new(|_, _| {
            Some(LocationRecord::new(GeoSource::Primary).with_city("Chicago"))
        }));
        let secondary = Scripted::new(Box::new(|_, _| {
            Some(LocationRecord::new(GeoSource::Secondary).with_iata("ORD"))
        }));
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(None)),
        );

        let record = resolver
            .resolve("ord1.nflxvideo.net", None, Some("198.38.96.1"))
            .await
            .unwrap();

        assert_eq!(record.provider(), GeoSource::Fallback);
        assert_eq!(primary.calls().len(), 2);
        assert_eq!(secondary.calls()[0], ("ord1.nflxvideo.net".to_string(), None, None));
    }

    #[tokio::test]
    async fn test_ipv6_address_queries_with_empty_ip() {
        let primary = Scripted::new(Box::new(|domain, _| {
            (domain == "lax1.nflxvideo.net").then(chicago)
        }));
        let secondary = Scripted::new(nothing());
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(Some("lax1.nflxvideo.net."))),
        );

        let record = resolver
            .resolve(
                "ipv6-c001-lax001.oca.nflxvideo.net",
                Some("2906"),
                Some("2a00:86c0:2040::1"),
            )
            .await
            .unwrap();

        let calls = primary.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "lax1.nflxvideo.net");
        assert_eq!(calls[0].2.as_deref(), Some(""));

        let annotations = record.annotations().unwrap();
        assert!(annotations.ipv6_workaround);
        assert!(!annotations.nat64_detected);
        assert_eq!(annotations.original_ip.as_deref(), Some("2a00:86c0:2040::1"));
        assert_eq!(annotations.ptr_domain.as_deref(), Some("lax1.nflxvideo.net"));
    }

    #[tokio::test]
    async fn test_colon_ptr_is_unusable() {
        let primary = Scripted::new(nothing());
        let secondary = Scripted::new(nothing());
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(Some("2a00:86c0::1"))),
        );

        let _ = resolver
            .resolve(
                "ipv6-c001-lax001.oca.nflxvideo.net",
                Some("2906"),
                Some("2a00:86c0:2040::1"),
            )
            .await;

        assert_eq!(primary.calls()[0].0, "ipv6-c001-lax001.oca.nflxvideo.net");
    }

    #[tokio::test]
    async fn test_ipv6_named_without_ip_goes_to_fallback() {
        let primary = Scripted::new(Box::new(|_, _| Some(chicago())));
        let secondary = Scripted::new(nothing());
        let resolver = HybridResolver::new(
            primary.clone(),
            secondary.clone(),
            Arc::new(FixedPtr(None)),
        );

        let record = resolver
            .resolve("ipv6-c001-lax001.oca.nflxvideo.net", None, None)
            .await;

        assert!(record.is_none());
        assert!(primary.calls().is_empty());
        assert_eq!(secondary.calls().len(), 1);
    }
}
