//! Compile-time defaults for the locator configuration
//!
//! Every value here can be overridden through [`crate::config::LocatorConfigBuilder`]
//! or the `NETFLIX_OCA_*` environment variables read by
//! [`crate::config::LocatorConfig::from_env`].

/// Application name, also used in the User-Agent sent to geocoding services
pub const APP_NAME: &str = "Netflix OCA Locator";

/// Application version reported in the User-Agent
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default public IP echo service (JSON body `{"ip": "..."}`)
pub const DEFAULT_IPIFY_API_URL: &str = "https://api.ipify.org?format=json";

/// Default Team Cymru WHOIS host
pub const DEFAULT_CYMRU_WHOIS_HOST: &str = "whois.cymru.com";

/// WHOIS TCP port
pub const WHOIS_PORT: u16 = 43;

/// Default Fast.com landing page
pub const DEFAULT_FAST_COM_URL: &str = "https://fast.com";

/// Default Fast.com speed-test API endpoint
pub const DEFAULT_FAST_COM_API_URL: &str = "https://api.fast.com/netflix/speedtest/v2";

/// Number of candidate URLs requested from Fast.com
pub const DEFAULT_URL_COUNT: u8 = 5;

/// Default TheAleph query endpoint
pub const DEFAULT_ALEPH_API_URL: &str = "https://thealeph.ai/api/query";

/// Default Nominatim search endpoint
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Smallest accepted per-request timeout in seconds
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 5;

/// Largest accepted per-request timeout in seconds
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default number of attempts for retried HTTP calls
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Largest accepted number of attempts
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Initial backoff delay between retried attempts, in milliseconds
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;

/// Backoff multiplier applied after every failed attempt
pub const RETRY_FACTOR: u64 = 2;

/// Upper bound for a single backoff delay, in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 10;

/// Default directory for exports and maps
pub const DEFAULT_EXPORT_PATH: &str = "./exports";

/// Default initial map zoom level
pub const DEFAULT_MAP_ZOOM: u8 = 4;

/// Reverse DNS cache TTL in seconds
pub const DEFAULT_RDNS_CACHE_TTL_SECS: u64 = 3600;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "NETFLIX_OCA_";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_bounds() {
        assert!(MIN_REQUEST_TIMEOUT_SECS <= DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(DEFAULT_REQUEST_TIMEOUT_SECS <= MAX_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_retry_values_reasonable() {
        assert!(DEFAULT_MAX_RETRIES >= 1);
        assert!(DEFAULT_MAX_RETRIES <= MAX_RETRIES_LIMIT);
        assert!(RETRY_INITIAL_DELAY_MS > 0);
        assert!(RETRY_MAX_DELAY_SECS * 1000 >= RETRY_INITIAL_DELAY_MS);
    }

    #[test]
    fn test_urls_are_https() {
        for url in [
            DEFAULT_IPIFY_API_URL,
            DEFAULT_FAST_COM_URL,
            DEFAULT_FAST_COM_API_URL,
            DEFAULT_ALEPH_API_URL,
            DEFAULT_NOMINATIM_URL,
        ] {
            assert!(url.starts_with("https://"), "{url} should use https");
        }
    }
}
