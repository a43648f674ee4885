//! Domain-name heuristic geocoder
//!
//! Reads airport codes and city names out of CDN hostnames. Well-known codes
//! resolve from a built-in table; anything else is geocoded through
//! Nominatim.

use super::iata::{extract_city_token, iata_candidates, lookup_airport};
use super::nominatim::{NominatimClient, Place};
use super::{GeoError, GeoProvider, GeoSource, LocationRecord};
use crate::config::LocatorConfig;
use async_trait::async_trait;

/// Secondary geocoding provider working from the hostname alone
#[derive(Debug, Clone)]
pub struct DomainHeuristicProvider {
    nominatim: Option<NominatimClient>,
}

impl DomainHeuristicProvider {
    /// Create a provider that falls back to Nominatim for unknown codes
    pub fn new(config: &LocatorConfig) -> Result<Self, GeoError> {
        Ok(Self {
            nominatim: Some(NominatimClient::new(config)?),
        })
    }

    /// Create a provider that only uses the built-in airport table
    pub fn offline() -> Self {
        Self { nominatim: None }
    }

    async fn geocode(&self, query: &str) -> Option<Place> {
        let client = self.nominatim.as_ref()?;
        match client.search(query).await {
            Ok(place) => place,
            Err(e) => {
                tracing::debug!("Nominatim lookup for {query:?} failed: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl GeoProvider for DomainHeuristicProvider {
    async fn resolve(
        &self,
        domain: &str,
        _asn: Option<&str>,
        _ip: Option<&str>,
    ) -> Option<LocationRecord> {
        let candidates = iata_candidates(domain);

        if let Some(airport) = candidates.iter().find_map(|code| lookup_airport(code)) {
            tracing::debug!("{domain}: matched known airport {}", airport.code);
            return Some(
                LocationRecord::new(GeoSource::Secondary)
                    .with_city(airport.city)
                    .with_country(airport.country)
                    .with_iata(airport.code)
                    .with_coordinates(airport.latitude, airport.longitude),
            );
        }

        if let Some(code) = candidates.first() {
            if let Some(place) = self.geocode(&format!("{code} airport")).await {
                tracing::debug!("{domain}: geocoded airport {code}");
                return Some(place_record(place).with_iata(code));
            }
        }

        if let Some(token) = extract_city_token(domain) {
            if let Some(place) = self.geocode(&token).await {
                tracing::debug!("{domain}: geocoded city token {token:?}");
                return Some(place_record(place));
            }
        }

        tracing::debug!("{domain}: no heuristic location");
        None
    }

    fn name(&self) -> &'static str {
        "domain_heuristic"
    }
}

fn place_record(place: Place) -> LocationRecord {
    let record = LocationRecord::new(GeoSource::Secondary)
        .with_city(place.city)
        .with_coordinates(place.latitude, place.longitude);
    match place.country {
        Some(country) => record.with_country(country),
        None => record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_airport_resolves_offline() {
        let provider = DomainHeuristicProvider::offline();
        let record = provider
            .resolve("ipv4-c001-ord001-ix.1.oca.nflxvideo.net", None, None)
            .await
            .unwrap();
        assert_eq!(record.iata_code(), Some("ORD"));
        assert_eq!(record.city(), Some("Chicago, IL"));
        assert_eq!(record.provider(), GeoSource::Secondary);
        assert!(record.is_good());
    }

    #[tokio::test]
    async fn test_known_airport_preferred_over_unknown_code() {
        let provider = DomainHeuristicProvider::offline();
        let record = provider
            .resolve("xyz1.sea2.example.net", None, None)
            .await
            .unwrap();
        assert_eq!(record.iata_code(), Some("SEA"));
    }

    #[tokio::test]
    async fn test_unknown_domain_offline_is_none() {
        let provider = DomainHeuristicProvider::offline();
        assert!(provider.resolve("example.invalid", None, None).await.is_none());
    }
}
