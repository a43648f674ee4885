//! TheAleph PTR-intelligence geocoder
//!
//! TheAleph classifies CDN PTR records and returns a location per record.
//! Its classification keys off the owning ASN, which is why the hybrid
//! resolver retries with Netflix's ASN.

use super::iata::{extract_iata, extract_with_pattern, normalize_iata};
use super::{GeoError, GeoProvider, GeoSource, LocationRecord};
use crate::config::LocatorConfig;
use crate::retry::with_retry;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::Value;

/// Request body for the TheAleph query endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlephQuery {
    /// Hostname being classified
    pub ptr_record: String,
    /// Address, or empty when unknown or not accepted
    pub ip: String,
    /// Owning ASN, omitted when not numeric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
}

impl AlephQuery {
    /// Build a query, dropping an ASN that is not a plain integer
    pub fn new(domain: &str, asn: Option<&str>, ip: Option<&str>) -> Self {
        let asn = asn.and_then(|raw| match raw.trim().parse::<u32>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!("Invalid ASN format {raw:?}, omitting from TheAleph query");
                None
            }
        });
        Self {
            ptr_record: domain.to_string(),
            ip: ip.unwrap_or_default().to_string(),
            asn,
        }
    }
}

/// Primary geocoding provider backed by TheAleph
#[derive(Debug, Clone)]
pub struct AlephProvider {
    client: reqwest::Client,
    api_url: String,
    max_retries: u32,
}

impl AlephProvider {
    /// Create a provider from the locator configuration
    ///
    /// Certificate verification follows `aleph_ssl_verify`; the service has a
    /// history of serving an expired certificate.
    pub fn new(config: &LocatorConfig) -> Result<Self, GeoError> {
        if !config.aleph_ssl_verify {
            tracing::debug!("TheAleph TLS certificate verification is disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent())
            .danger_accept_invalid_certs(!config.aleph_ssl_verify)
            .build()
            .map_err(|e| GeoError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.aleph_api_url.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Send one query and parse the answer
    pub async fn query(&self, query: &AlephQuery) -> Result<Option<LocationRecord>, GeoError> {
        tracing::debug!(
            "TheAleph query: ptr_record={} ip={:?} asn={:?}",
            query.ptr_record,
            query.ip,
            query.asn
        );
        let body: Value = with_retry(self.max_retries, "TheAleph query", move || async move {
            let response = self
                .client
                .post(&self.api_url)
                .header(ACCEPT, "application/json")
                .header(CONTENT_TYPE, "application/json")
                .json(query)
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, GeoError>(response.json::<Value>().await?)
        })
        .await?;

        Ok(parse_aleph_response(&body, &query.ptr_record))
    }
}

#[async_trait]
impl GeoProvider for AlephProvider {
    async fn resolve(
        &self,
        domain: &str,
        asn: Option<&str>,
        ip: Option<&str>,
    ) -> Option<LocationRecord> {
        let query = AlephQuery::new(domain, asn, ip);
        match self.query(&query).await {
            Ok(record) => record,
            Err(GeoError::Http(e)) if e.status().is_some_and(|s| s.as_u16() == 500) => {
                // Routine answer for records the service cannot classify
                tracing::debug!("TheAleph returned 500 for {domain}");
                None
            }
            Err(GeoError::Http(e)) if e.is_status() => {
                tracing::warn!("TheAleph HTTP error for {domain}: {e}");
                None
            }
            Err(e) => {
                tracing::debug!("TheAleph lookup failed for {domain}: {e}");
                None
            }
        }
    }

    fn name(&self) -> &'static str {
        "thealeph"
    }
}

/// Turn a TheAleph response body into a location record
///
/// `ptr_record` is the hostname that was queried; the response's
/// `regular_expression` is applied to it when `geo_hint` is unusable.
/// Returns `None` unless the body yields a latitude, a city or an IATA code.
pub fn parse_aleph_response(data: &Value, ptr_record: &str) -> Option<LocationRecord> {
    let info = data.get("location_info")?;
    if !info.is_object() || info.as_object().is_some_and(serde_json::Map::is_empty) {
        tracing::debug!("Empty location_info from TheAleph for {ptr_record}");
        return None;
    }

    let latitude = number_field(info, "latitude");
    let longitude = number_field(info, "longitude");

    let mut city_parts: Vec<&str> = Vec::new();
    if let Some(city) = text_field(info, "city") {
        city_parts.push(city);
    }
    if let Some(region) = text_field(info, "state").or_else(|| text_field(info, "region")) {
        city_parts.push(region);
    }
    let city = (!city_parts.is_empty()).then(|| city_parts.join(", "));

    let iata = text_field(data, "geo_hint")
        .and_then(normalize_iata)
        .or_else(|| {
            text_field(data, "regular_expression")
                .and_then(|pattern| extract_with_pattern(pattern, ptr_record))
        })
        .or_else(|| extract_iata(ptr_record));

    if latitude.is_none() && city.is_none() && iata.is_none() {
        tracing::debug!("TheAleph response for {ptr_record} had no usable location");
        return None;
    }

    let mut record = LocationRecord::new(GeoSource::Primary);
    if let Some(city) = city {
        record = record.with_city(city);
    }
    if let Some(code) = iata {
        record = record.with_iata(&code);
    }
    if let (Some(lat), Some(lon)) = (latitude, longitude) {
        record = record.with_coordinates(lat, lon);
    }
    if let Some(country) = text_field(info, "country") {
        record = record.with_country(country);
    }
    Some(record)
}

fn text_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn number_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PTR: &str = "ipv4-c148-ord003-ix.1.oca.nflxvideo.net";

    #[test]
    fn test_query_serialization() {
        let query = AlephQuery::new(PTR, Some("2906"), None);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, json!({"ptr_record": PTR, "ip": "", "asn": 2906}));
    }

    #[test]
    fn test_query_drops_invalid_asn() {
        let query = AlephQuery::new(PTR, Some("AS2906x"), Some("198.38.96.1"));
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, json!({"ptr_record": PTR, "ip": "198.38.96.1"}));
    }

    #[test]
    fn test_parse_full_response() {
        let data = json!({
            "ptr_record": PTR,
            "asn": 2906,
            "location_info": {
                "city": "Chicago",
                "state": "IL",
                "region": "",
                "country": "US",
                "latitude": 41.978252,
                "longitude": -87.90923
            },
            "regular_expression": "([a-z]{3})(\\d{3})",
            "geo_hint": "ord"
        });
        let record = parse_aleph_response(&data, PTR).unwrap();
        assert_eq!(record.city(), Some("Chicago, IL"));
        assert_eq!(record.iata_code(), Some("ORD"));
        assert_eq!(record.country(), Some("US"));
        assert_eq!(record.coordinates(), Some((41.978252, -87.90923)));
        assert_eq!(record.provider(), GeoSource::Primary);
    }

    #[test]
    fn test_region_used_when_state_missing() {
        let data = json!({"location_info": {"city": "Amsterdam", "region": "NH"}});
        let record = parse_aleph_response(&data, "ams1.example.net").unwrap();
        assert_eq!(record.city(), Some("Amsterdam, NH"));
    }

    #[test]
    fn test_regex_used_when_hint_missing() {
        let data = json!({
            "location_info": {"city": "Chicago"},
            "regular_expression": "([a-z]{3})(\\d{3})",
            "geo_hint": ""
        });
        let record = parse_aleph_response(&data, PTR).unwrap();
        assert_eq!(record.iata_code(), Some("ORD"));
    }

    #[test]
    fn test_missing_location_info_is_none() {
        assert!(parse_aleph_response(&json!({"geo_hint": "ord"}), PTR).is_none());
        assert!(parse_aleph_response(&json!({"location_info": {}}), PTR).is_none());
        assert!(parse_aleph_response(&json!({"location_info": null}), PTR).is_none());
    }

    #[test]
    fn test_useless_location_info_is_none() {
        let data = json!({"location_info": {"country": "US"}});
        assert!(parse_aleph_response(&data, "example.invalid").is_none());
    }

    #[test]
    fn test_string_coordinates_accepted() {
        let data = json!({"location_info": {"latitude": "52.31", "longitude": "4.76"}});
        let record = parse_aleph_response(&data, "example.invalid").unwrap();
        assert_eq!(record.coordinates(), Some((52.31, 4.76)));
    }
}
