//! Location records produced by the geocoding providers

use super::iata::normalize_iata;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder coordinate some providers emit when they know nothing
pub const COORDINATE_SENTINEL: f64 = 0.0;

/// Which source produced a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GeoSource {
    /// TheAleph PTR intelligence
    #[default]
    #[serde(rename = "thealeph")]
    Primary,
    /// Domain-name heuristics queried directly
    #[serde(rename = "domain_heuristic")]
    Secondary,
    /// Domain-name heuristics reached after the primary chain gave up
    #[serde(rename = "fallback")]
    Fallback,
}

impl GeoSource {
    /// Serialized tag of this source
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoSource::Primary => "thealeph",
            GeoSource::Secondary => "domain_heuristic",
            GeoSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for GeoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra context recorded when the resolver had to work around the domain name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallbackAnnotations {
    /// An IPv6 address was replaced by its PTR name or an empty IP
    #[serde(default)]
    pub ipv6_workaround: bool,
    /// An "ipv6" domain resolved to an IPv4 address
    #[serde(default)]
    pub nat64_detected: bool,
    /// Domain the caller asked about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_domain: Option<String>,
    /// Address the caller supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_ip: Option<String>,
    /// PTR hostname queried in place of the original domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ptr_domain: Option<String>,
}

/// Approximate geography of a candidate server
///
/// Construction enforces the invariants: an IATA code is three ASCII letters
/// stored upper-case, and coordinates are kept only when both are finite and
/// inside `[-90, 90]` / `[-180, 180]`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "StoredLocation")]
pub struct LocationRecord {
    city: Option<String>,
    iata_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    country: Option<String>,
    provider: GeoSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<FallbackAnnotations>,
}

/// Serialized shape of a [`LocationRecord`], re-validated on load
#[derive(Deserialize)]
struct StoredLocation {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    iata_code: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    provider: GeoSource,
    #[serde(default)]
    annotations: Option<FallbackAnnotations>,
}

impl From<StoredLocation> for LocationRecord {
    fn from(stored: StoredLocation) -> Self {
        let mut record = LocationRecord::new(stored.provider);
        if let Some(city) = stored.city {
            record = record.with_city(city);
        }
        if let Some(code) = stored.iata_code {
            record = record.with_iata(&code);
        }
        if let (Some(lat), Some(lon)) = (stored.latitude, stored.longitude) {
            record = record.with_coordinates(lat, lon);
        }
        if let Some(country) = stored.country {
            record = record.with_country(country);
        }
        record.annotations = stored.annotations;
        record
    }
}

impl LocationRecord {
    /// Empty record attributed to `provider`
    pub fn new(provider: GeoSource) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    /// Set the city, ignoring blank values
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        let city = city.into();
        let trimmed = city.trim();
        self.city = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Set the IATA code; anything other than three letters is dropped
    pub fn with_iata(mut self, code: &str) -> Self {
        self.iata_code = normalize_iata(code);
        self
    }

    /// Set both coordinates; out-of-range or non-finite pairs are dropped
    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        if valid_latitude(latitude) && valid_longitude(longitude) {
            self.latitude = Some(latitude);
            self.longitude = Some(longitude);
        } else {
            tracing::debug!("Dropping out-of-range coordinates ({latitude}, {longitude})");
            self.latitude = None;
            self.longitude = None;
        }
        self
    }

    /// Set the country, ignoring blank values
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        let country = country.into();
        let trimmed = country.trim();
        self.country = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Attach fallback annotations
    pub fn with_annotations(mut self, annotations: FallbackAnnotations) -> Self {
        self.annotations = Some(annotations);
        self
    }

    /// Re-attribute the record to another source
    pub fn with_provider(mut self, provider: GeoSource) -> Self {
        self.provider = provider;
        self
    }

    /// City, possibly composite such as "Chicago, IL"
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Upper-case three-letter airport code
    pub fn iata_code(&self) -> Option<&str> {
        self.iata_code.as_deref()
    }

    /// Latitude in degrees
    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    /// Longitude in degrees
    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// Both coordinates, when known
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Country name or code as reported by the provider
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Source of the record
    pub fn provider(&self) -> GeoSource {
        self.provider
    }

    /// Workaround annotations, if any were needed
    pub fn annotations(&self) -> Option<&FallbackAnnotations> {
        self.annotations.as_ref()
    }

    /// Short label for how the record was obtained
    pub fn method(&self) -> &'static str {
        match (&self.annotations, self.provider) {
            (Some(a), _) if a.nat64_detected => "nat64_ptr",
            (Some(a), _) if a.ipv6_workaround => "ipv6_ptr",
            (_, GeoSource::Fallback) => "fallback",
            (_, GeoSource::Secondary) => "heuristic",
            (_, GeoSource::Primary) => "direct",
        }
    }

    /// Whether the record is good enough to stop looking further
    ///
    /// True when both coordinates are present and neither is the placeholder
    /// sentinel, or when both a city and an IATA code are present.
    pub fn is_good(&self) -> bool {
        let has_coordinates = matches!(
            (self.latitude, self.longitude),
            (Some(lat), Some(lon)) if lat != COORDINATE_SENTINEL && lon != COORDINATE_SENTINEL
        );
        has_coordinates || (self.city.is_some() && self.iata_code.is_some())
    }

    /// Whether the record carries any usable information at all
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.iata_code.is_none() && self.latitude.is_none()
    }
}

fn valid_latitude(value: f64) -> bool {
    value.is_finite() && (-90.0..=90.0).contains(&value)
}

fn valid_longitude(value: f64) -> bool {
    value.is_finite() && (-180.0..=180.0).contains(&value)
}

/// Good-result check over an optional record
pub fn is_good_result(record: Option<&LocationRecord>) -> bool {
    record.is_some_and(LocationRecord::is_good)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iata_is_normalized() {
        let record = LocationRecord::new(GeoSource::Primary).with_iata("ord");
        assert_eq!(record.iata_code(), Some("ORD"));

        let record = LocationRecord::new(GeoSource::Primary).with_iata("or1");
        assert_eq!(record.iata_code(), None);

        let record = LocationRecord::new(GeoSource::Primary).with_iata("ORDX");
        assert_eq!(record.iata_code(), None);
    }

    #[test]
    fn test_deserialize_applies_invariants() {
        let record: LocationRecord =
            serde_json::from_str(r#"{"iata_code":"ord1","latitude":500,"longitude":10}"#).unwrap();
        assert_eq!(record.iata_code(), None);
        assert_eq!(record.coordinates(), None);

        let record: LocationRecord =
            serde_json::from_str(r#"{"city":"Chicago, IL","iata_code":"ord","latitude":41.97}"#).unwrap();
        assert_eq!(record.iata_code(), Some("ORD"));
        assert_eq!(record.city(), Some("Chicago, IL"));
        assert_eq!(record.latitude(), None);
    }

    #[test]
    fn test_serde_round_trip_keeps_valid_record() {
        let record = LocationRecord::new(GeoSource::Fallback)
            .with_city("Nashville, TN")
            .with_iata("BNA")
            .with_coordinates(36.1245, -86.6782);
        let json = serde_json::to_string(&record).unwrap();
        let back: LocationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_out_of_range_coordinates_dropped() {
        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(91.0, 10.0);
        assert_eq!(record.coordinates(), None);

        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(10.0, -180.5);
        assert_eq!(record.coordinates(), None);

        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(f64::NAN, 10.0);
        assert_eq!(record.coordinates(), None);

        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(-90.0, 180.0);
        assert_eq!(record.coordinates(), Some((-90.0, 180.0)));
    }

    #[test]
    fn test_good_with_coordinates() {
        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(41.97, -87.90);
        assert!(record.is_good());
    }

    #[test]
    fn test_sentinel_coordinates_not_good() {
        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(0.0, 0.0);
        assert!(!record.is_good());

        let record = LocationRecord::new(GeoSource::Primary).with_coordinates(41.97, 0.0);
        assert!(!record.is_good());
    }

    #[test]
    fn test_good_with_city_and_iata() {
        let record = LocationRecord::new(GeoSource::Primary)
            .with_city("Chicago, IL")
            .with_iata("ORD");
        assert!(record.is_good());
    }

    #[test]
    fn test_city_alone_not_good() {
        let record = LocationRecord::new(GeoSource::Primary).with_city("Chicago, IL");
        assert!(!record.is_good());
        assert!(!is_good_result(None));
    }

    #[test]
    fn test_blank_city_ignored() {
        let record = LocationRecord::new(GeoSource::Primary).with_city("  ");
        assert_eq!(record.city(), None);
        assert!(record.is_empty());
    }

    #[test]
    fn test_method_labels() {
        let direct = LocationRecord::new(GeoSource::Primary);
        assert_eq!(direct.method(), "direct");

        let nat64 = LocationRecord::new(GeoSource::Primary).with_annotations(FallbackAnnotations {
            nat64_detected: true,
            ..Default::default()
        });
        assert_eq!(nat64.method(), "nat64_ptr");

        let fallback = LocationRecord::new(GeoSource::Fallback);
        assert_eq!(fallback.method(), "fallback");
    }

    #[test]
    fn test_provider_tags_serialize() {
        let json = serde_json::to_string(&GeoSource::Fallback).unwrap();
        assert_eq!(json, "\"fallback\"");
        let parsed: GeoSource = serde_json::from_str("\"thealeph\"").unwrap();
        assert_eq!(parsed, GeoSource::Primary);
    }
}
