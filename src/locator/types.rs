//! Result types produced by a locator run

use crate::asn::IspRecord;
use crate::geo::LocationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// One Fast.com-suggested Open Connect Appliance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcaCandidate {
    /// Hostname from the speed-test URL
    pub domain: String,
    /// Address the hostname resolved to
    pub ip: IpAddr,
    /// Speed-test URL as returned by Fast.com
    pub url: String,
    /// Approximate location, when any provider knew it
    #[serde(default)]
    pub location: Option<LocationRecord>,
    /// ASN announcing the appliance's address
    #[serde(default)]
    pub asn: Option<String>,
    /// Name of that ASN
    #[serde(default)]
    pub as_name: Option<String>,
}

impl OcaCandidate {
    /// Un-enriched candidate
    pub fn new(domain: impl Into<String>, ip: IpAddr, url: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ip,
            url: url.into(),
            location: None,
            asn: None,
            as_name: None,
        }
    }

    /// Whether enrichment produced a location
    pub fn is_located(&self) -> bool {
        self.location.is_some()
    }

    /// "City (IATA)" style label for tables and popups
    pub fn location_label(&self) -> String {
        let Some(location) = &self.location else {
            return "Unknown".to_string();
        };
        match (location.city(), location.iata_code()) {
            (Some(city), Some(iata)) => format!("{city} ({iata})"),
            (Some(city), None) => city.to_string(),
            (None, Some(iata)) => iata.to_string(),
            (None, None) => "Unknown".to_string(),
        }
    }
}

/// Everything one run found
///
/// Built once at the end of [`crate::locator::OcaLocator::locate`] and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorResult {
    public_ip: IpAddr,
    isp: IspRecord,
    candidates: Vec<OcaCandidate>,
    token: String,
    query_time: DateTime<Utc>,
}

impl LocatorResult {
    /// Assemble a result
    pub fn new(
        public_ip: IpAddr,
        isp: IspRecord,
        candidates: Vec<OcaCandidate>,
        token: String,
        query_time: DateTime<Utc>,
    ) -> Self {
        Self {
            public_ip,
            isp,
            candidates,
            token,
            query_time,
        }
    }

    /// Public address of this host
    pub fn public_ip(&self) -> IpAddr {
        self.public_ip
    }

    /// Ownership of the public address
    pub fn isp(&self) -> &IspRecord {
        &self.isp
    }

    /// Enriched candidates, in Fast.com order
    pub fn candidates(&self) -> &[OcaCandidate] {
        &self.candidates
    }

    /// Fast.com token used for the run
    pub fn token(&self) -> &str {
        &self.token
    }

    /// When the run started
    pub fn query_time(&self) -> DateTime<Utc> {
        self.query_time
    }

    /// Number of candidates
    pub fn total_ocas(&self) -> usize {
        self.candidates.len()
    }

    /// Candidates with both coordinates known
    pub fn located(&self) -> impl Iterator<Item = (&OcaCandidate, (f64, f64))> {
        self.candidates.iter().filter_map(|c| {
            c.location
                .as_ref()
                .and_then(LocationRecord::coordinates)
                .map(|coords| (c, coords))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoSource;

    #[test]
    fn test_location_label() {
        let ip: IpAddr = "198.38.96.1".parse().unwrap();
        let mut candidate = OcaCandidate::new("ord1.nflxvideo.net", ip, "https://ord1.nflxvideo.net/speedtest");
        assert_eq!(candidate.location_label(), "Unknown");
        assert!(!candidate.is_located());

        candidate.location = Some(
            LocationRecord::new(GeoSource::Primary)
                .with_city("Chicago, IL")
                .with_iata("ord"),
        );
        assert_eq!(candidate.location_label(), "Chicago, IL (ORD)");
    }

    #[test]
    fn test_located_filters_missing_coordinates() {
        let ip: IpAddr = "198.38.96.1".parse().unwrap();
        let mut with_coords = OcaCandidate::new("a.example", ip, "https://a.example/");
        with_coords.location =
            Some(LocationRecord::new(GeoSource::Primary).with_coordinates(41.97, -87.9));
        let without = OcaCandidate::new("b.example", ip, "https://b.example/");

        let result = LocatorResult::new(
            ip,
            IspRecord::unknown(ip),
            vec![with_coords, without],
            "token".to_string(),
            Utc::now(),
        );
        assert_eq!(result.total_ocas(), 2);
        assert_eq!(result.located().count(), 1);
    }
}
