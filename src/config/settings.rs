//! Immutable locator configuration
//!
//! A [`LocatorConfig`] is built once at process start, either through the
//! builder or from `NETFLIX_OCA_*` environment variables, and then shared
//! read-only with every component.

use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which geocoding strategy enrichment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodingProvider {
    /// TheAleph first, then the domain heuristic geocoder
    #[default]
    Hybrid,
    /// TheAleph only
    Aleph,
    /// Domain-name heuristics and Nominatim only
    Heuristic,
}

impl std::str::FromStr for GeocodingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hybrid" => Ok(Self::Hybrid),
            "aleph" | "thealeph" => Ok(Self::Aleph),
            "heuristic" | "geopy" => Ok(Self::Heuristic),
            other => Err(format!("unknown geocoding provider: {other}")),
        }
    }
}

/// Configuration shared by every locator component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// IP echo service returning `{"ip": "..."}`
    pub ipify_api_url: String,
    /// Team Cymru WHOIS host
    pub cymru_whois_host: String,
    /// Fast.com landing page
    pub fast_com_url: String,
    /// Fast.com speed-test API endpoint
    pub fast_com_api_url: String,
    /// Number of candidate URLs to request
    pub url_count: u8,
    /// TheAleph query endpoint
    pub aleph_api_url: String,
    /// Verify TheAleph's TLS certificate
    pub aleph_ssl_verify: bool,
    /// Nominatim search endpoint
    pub nominatim_url: String,
    /// Geocoding strategy
    pub geocoding_provider: GeocodingProvider,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Attempts for retried HTTP calls (including the first)
    pub max_retries: u32,
    /// Directory for exports and maps
    pub export_path: PathBuf,
    /// Initial map zoom level
    pub map_zoom: u8,
    /// Decorate terminal output with emoji
    pub show_emoji: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            ipify_api_url: DEFAULT_IPIFY_API_URL.to_string(),
            cymru_whois_host: DEFAULT_CYMRU_WHOIS_HOST.to_string(),
            fast_com_url: DEFAULT_FAST_COM_URL.to_string(),
            fast_com_api_url: DEFAULT_FAST_COM_API_URL.to_string(),
            url_count: DEFAULT_URL_COUNT,
            aleph_api_url: DEFAULT_ALEPH_API_URL.to_string(),
            aleph_ssl_verify: false,
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            geocoding_provider: GeocodingProvider::Hybrid,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            map_zoom: DEFAULT_MAP_ZOOM,
            show_emoji: true,
        }
    }
}

impl LocatorConfig {
    /// Create a new LocatorConfig builder
    pub fn builder() -> LocatorConfigBuilder {
        LocatorConfigBuilder::new()
    }

    /// User-Agent sent to third-party services
    pub fn user_agent(&self) -> String {
        format!("{APP_NAME}/{APP_VERSION}")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let secs = self.request_timeout.as_secs();
        if !(MIN_REQUEST_TIMEOUT_SECS..=MAX_REQUEST_TIMEOUT_SECS).contains(&secs) {
            return Err(format!(
                "request_timeout must be between {MIN_REQUEST_TIMEOUT_SECS} and {MAX_REQUEST_TIMEOUT_SECS} seconds"
            ));
        }
        if self.max_retries < 1 || self.max_retries > MAX_RETRIES_LIMIT {
            return Err(format!(
                "max_retries must be between 1 and {MAX_RETRIES_LIMIT}"
            ));
        }
        if !(1..=18).contains(&self.map_zoom) {
            return Err("map_zoom must be between 1 and 18".to_string());
        }
        if self.url_count == 0 {
            return Err("url_count must be at least 1".to_string());
        }
        for (name, value) in [
            ("ipify_api_url", &self.ipify_api_url),
            ("fast_com_url", &self.fast_com_url),
            ("fast_com_api_url", &self.fast_com_api_url),
            ("aleph_api_url", &self.aleph_api_url),
            ("nominatim_url", &self.nominatim_url),
        ] {
            url::Url::parse(value).map_err(|e| format!("{name} is not a valid URL: {e}"))?;
        }
        if self.cymru_whois_host.trim().is_empty() {
            return Err("cymru_whois_host must not be empty".to_string());
        }
        Ok(())
    }

    /// Build a configuration from `NETFLIX_OCA_*` environment variables
    ///
    /// Unset variables keep their defaults. The result is validated.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    ///
    /// The lookup receives full variable names, e.g. `NETFLIX_OCA_REQUEST_TIMEOUT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut builder = LocatorConfigBuilder::new();

        if let Some(v) = get("IPIFY_API_URL") {
            builder = builder.ipify_api_url(v);
        }
        if let Some(v) = get("CYMRU_WHOIS_HOST") {
            builder = builder.cymru_whois_host(v);
        }
        if let Some(v) = get("FAST_COM_URL") {
            builder = builder.fast_com_url(v);
        }
        if let Some(v) = get("FAST_COM_API_URL") {
            builder = builder.fast_com_api_url(v);
        }
        if let Some(v) = get("ALEPH_API_URL") {
            builder = builder.aleph_api_url(v);
        }
        if let Some(v) = get("ALEPH_SSL_VERIFY") {
            builder = builder.aleph_ssl_verify(parse_bool("ALEPH_SSL_VERIFY", &v)?);
        }
        if let Some(v) = get("NOMINATIM_URL") {
            builder = builder.nominatim_url(v);
        }
        if let Some(v) = get("GEOCODING_PROVIDER") {
            builder = builder.geocoding_provider(v.parse()?);
        }
        if let Some(v) = get("REQUEST_TIMEOUT") {
            let secs: u64 = v
                .trim()
                .parse()
                .map_err(|_| format!("REQUEST_TIMEOUT is not a number of seconds: {v}"))?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(v) = get("MAX_RETRIES") {
            let retries: u32 = v
                .trim()
                .parse()
                .map_err(|_| format!("MAX_RETRIES is not a number: {v}"))?;
            builder = builder.max_retries(retries);
        }
        if let Some(v) = get("EXPORT_PATH") {
            builder = builder.export_path(v);
        }
        if let Some(v) = get("MAP_ZOOM") {
            let zoom: u8 = v
                .trim()
                .parse()
                .map_err(|_| format!("MAP_ZOOM is not a number: {v}"))?;
            builder = builder.map_zoom(zoom);
        }
        if let Some(v) = get("SHOW_EMOJI") {
            builder = builder.show_emoji(parse_bool("SHOW_EMOJI", &v)?);
        }

        builder.build()
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(format!("{name} is not a boolean: {value}")),
    }
}

/// Builder for LocatorConfig
pub struct LocatorConfigBuilder {
    config: LocatorConfig,
}

impl LocatorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LocatorConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Set the IP echo service URL
    pub fn ipify_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.ipify_api_url = url.into();
        self
    }

    /// Set the Team Cymru WHOIS host
    pub fn cymru_whois_host(mut self, host: impl Into<String>) -> Self {
        self.config.cymru_whois_host = host.into();
        self
    }

    /// Set the Fast.com landing page URL
    pub fn fast_com_url(mut self, url: impl Into<String>) -> Self {
        self.config.fast_com_url = url.into();
        self
    }

    /// Set the Fast.com API endpoint
    pub fn fast_com_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.fast_com_api_url = url.into();
        self
    }

    /// Set the number of candidate URLs requested from Fast.com
    pub fn url_count(mut self, count: u8) -> Self {
        self.config.url_count = count;
        self
    }

    /// Set TheAleph endpoint
    pub fn aleph_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.aleph_api_url = url.into();
        self
    }

    /// Enable or disable TLS verification for TheAleph
    pub fn aleph_ssl_verify(mut self, verify: bool) -> Self {
        self.config.aleph_ssl_verify = verify;
        self
    }

    /// Set the Nominatim search endpoint
    pub fn nominatim_url(mut self, url: impl Into<String>) -> Self {
        self.config.nominatim_url = url.into();
        self
    }

    /// Select the geocoding strategy
    pub fn geocoding_provider(mut self, provider: GeocodingProvider) -> Self {
        self.config.geocoding_provider = provider;
        self
    }

    /// Set the per-request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the number of attempts for retried calls
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set the export directory
    pub fn export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.export_path = path.into();
        self
    }

    /// Set the initial map zoom
    pub fn map_zoom(mut self, zoom: u8) -> Self {
        self.config.map_zoom = zoom;
        self
    }

    /// Enable or disable emoji in terminal output
    pub fn show_emoji(mut self, show: bool) -> Self {
        self.config.show_emoji = show;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<LocatorConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for LocatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
