//! Nominatim free-text search client

use super::GeoError;
use crate::config::LocatorConfig;
use crate::retry::with_retry;
use serde::Deserialize;

/// A place returned by Nominatim
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    /// First two components of the display name, e.g. "O'Hare, Chicago"
    pub city: String,
    /// Last component of the display name
    pub country: Option<String>,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// Client for the Nominatim `/search` endpoint
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: reqwest::Client,
    search_url: String,
    max_retries: u32,
}

impl NominatimClient {
    /// Create a client from the locator configuration
    ///
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(config: &LocatorConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| GeoError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            search_url: config.nominatim_url.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Geocode a free-text query, returning the best hit
    pub async fn search(&self, query: &str) -> Result<Option<Place>, GeoError> {
        let hits: Vec<SearchHit> = with_retry(self.max_retries, "Nominatim search", move || async move {
            let response = self
                .client
                .get(&self.search_url)
                .query(&[("q", query), ("format", "json"), ("limit", "1")])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, GeoError>(response.json::<Vec<SearchHit>>().await?)
        })
        .await?;

        hits.into_iter().next().map(parse_hit).transpose()
    }
}

fn parse_hit(hit: SearchHit) -> Result<Place, GeoError> {
    let latitude: f64 = hit
        .lat
        .trim()
        .parse()
        .map_err(|_| GeoError::InvalidResponse(format!("bad latitude {:?}", hit.lat)))?;
    let longitude: f64 = hit
        .lon
        .trim()
        .parse()
        .map_err(|_| GeoError::InvalidResponse(format!("bad longitude {:?}", hit.lon)))?;

    let parts: Vec<&str> = hit
        .display_name
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let city = parts.iter().take(2).copied().collect::<Vec<_>>().join(", ");
    let country = if parts.len() > 2 {
        parts.last().map(|s| (*s).to_string())
    } else {
        None
    };

    Ok(Place {
        city,
        country,
        latitude,
        longitude,
    })
}
