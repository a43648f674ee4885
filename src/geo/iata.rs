//! IATA airport-code extraction from CDN hostnames
//!
//! One pattern set serves both providers: TheAleph responses that lack a
//! usable hint and the domain heuristic geocoder.

use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns tried in order against the lower-cased hostname
static IATA_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\.([a-z]{3})\d*\.",
        r"-([a-z]{3})\d*-",
        r"-([a-z]{3})\d*\.",
        r"^([a-z]{3})\d*\.",
        r"\.([a-z]{3})$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Patterns that pull a literal city token out of a hostname
static CITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r"\.([a-z]+)-dc\.", r"\.([a-z]+)pop\.", r"-([a-z]+)\d*\."]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Three-letter hostname labels that are never airport codes
const NOISE_CODES: &[&str] = &["oca", "www", "net", "com", "org", "cdn", "ipv", "api", "dns"];

/// Infrastructure words that are never city names
const NON_CITY_TOKENS: &[&str] = &["cdn", "edge", "cache", "pop", "dc"];

/// Static data for a well-known airport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Airport {
    /// Upper-case IATA code
    pub code: &'static str,
    /// City, with region where customary
    pub city: &'static str,
    /// Country
    pub country: &'static str,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

const fn airport(
    code: &'static str,
    city: &'static str,
    country: &'static str,
    latitude: f64,
    longitude: f64,
) -> Airport {
    Airport {
        code,
        city,
        country,
        latitude,
        longitude,
    }
}

/// Major Open Connect locations that need no network lookup
pub static AIRPORTS: &[Airport] = &[
    airport("LAX", "Los Angeles, CA", "USA", 33.9425, -118.4081),
    airport("ORD", "Chicago, IL", "USA", 41.9742, -87.9073),
    airport("ATL", "Atlanta, GA", "USA", 33.6407, -84.4277),
    airport("DFW", "Dallas, TX", "USA", 32.8998, -97.0403),
    airport("DEN", "Denver, CO", "USA", 39.8561, -104.6737),
    airport("JFK", "New York, NY", "USA", 40.6413, -73.7781),
    airport("SFO", "San Francisco, CA", "USA", 37.6213, -122.3790),
    airport("SEA", "Seattle, WA", "USA", 47.4502, -122.3088),
    airport("MIA", "Miami, FL", "USA", 25.7959, -80.2870),
    airport("BOS", "Boston, MA", "USA", 42.3656, -71.0096),
    airport("PHX", "Phoenix, AZ", "USA", 33.4352, -112.0101),
    airport("LAS", "Las Vegas, NV", "USA", 36.0840, -115.1537),
    airport("IAD", "Washington, DC", "USA", 38.9531, -77.4565),
    airport("AMS", "Amsterdam", "Netherlands", 52.3105, 4.7683),
    airport("LHR", "London", "UK", 51.4700, -0.4543),
    airport("CDG", "Paris", "France", 49.0097, 2.5479),
    airport("FRA", "Frankfurt", "Germany", 50.0379, 8.5622),
    airport("NRT", "Tokyo", "Japan", 35.7720, 140.3929),
    airport("SIN", "Singapore", "Singapore", 1.3644, 103.9915),
    airport("SYD", "Sydney", "Australia", -33.9399, 151.1753),
    airport("GRU", "São Paulo", "Brazil", -23.4356, -46.4731),
    airport("MEX", "Mexico City", "Mexico", 19.4363, -99.0721),
    airport("YYZ", "Toronto", "Canada", 43.6777, -79.6248),
];

/// Upper-case `code` if it is exactly three ASCII letters
pub fn normalize_iata(code: &str) -> Option<String> {
    let code = code.trim();
    (code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}

/// All plausible IATA codes in `hostname`, in pattern order, upper-case
///
/// Every match of a pattern is considered before the next pattern runs.
/// Duplicates and noise labels are dropped.
pub fn iata_candidates(hostname: &str) -> Vec<String> {
    let lowered = hostname.trim().trim_end_matches('.').to_ascii_lowercase();
    let mut found: Vec<String> = Vec::new();

    for pattern in IATA_PATTERNS.iter() {
        // Matches may share their delimiting dot, so resume one byte past
        // each match start. Every pattern begins with an ASCII byte.
        let mut start = 0;
        while let Some(caps) = pattern.captures_at(&lowered, start) {
            let Some(whole) = caps.get(0) else { break };
            start = whole.start() + 1;

            let Some(code) = caps.get(1).map(|m| m.as_str()) else {
                continue;
            };
            if NOISE_CODES.contains(&code) {
                continue;
            }
            if let Some(code) = normalize_iata(code) {
                if !found.contains(&code) {
                    found.push(code);
                }
            }
            if start >= lowered.len() {
                break;
            }
        }
    }

    found
}

/// First plausible IATA code in `hostname`
///
/// # Examples
///
/// ```
/// use oca_locator::geo::iata::extract_iata;
///
/// assert_eq!(extract_iata("ord1.nflxvideo.net").as_deref(), Some("ORD"));
/// assert_eq!(extract_iata("example.invalid"), None);
/// ```
pub fn extract_iata(hostname: &str) -> Option<String> {
    iata_candidates(hostname).into_iter().next()
}

/// Apply a provider-supplied pattern to `hostname`, returning group 1 as IATA
pub fn extract_with_pattern(pattern: &str, hostname: &str) -> Option<String> {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::debug!("Ignoring invalid provider pattern {pattern:?}: {e}");
            return None;
        }
    };
    let caps = regex.captures(hostname)?;
    normalize_iata(caps.get(1)?.as_str())
}

/// Static airport data for `code`, case-insensitive
pub fn lookup_airport(code: &str) -> Option<&'static Airport> {
    AIRPORTS.iter().find(|a| a.code.eq_ignore_ascii_case(code))
}

/// A literal city token embedded in `hostname`, if any
pub fn extract_city_token(hostname: &str) -> Option<String> {
    let lowered = hostname.to_ascii_lowercase();
    CITY_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(&lowered).find_map(|caps| {
            let token = caps.get(1)?.as_str();
            (token.len() > 2 && !NON_CITY_TOKENS.contains(&token)).then(|| token.to_string())
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_code() {
        assert_eq!(extract_iata("ord1.nflxvideo.net").as_deref(), Some("ORD"));
    }

    #[test]
    fn test_hyphenated_code() {
        assert_eq!(
            extract_iata("ipv4-c001-ord001-ix.1.oca.nflxvideo.net").as_deref(),
            Some("ORD")
        );
        assert_eq!(
            extract_iata("ipv6-c001-lax001.oca.nflxvideo.net").as_deref(),
            Some("LAX")
        );
    }

    #[test]
    fn test_noise_labels_rejected() {
        assert_eq!(extract_iata("www.example.com"), None);
        assert_eq!(extract_iata("cdn.oca.net"), None);
    }

    #[test]
    fn test_all_matches_of_a_pattern_are_tried() {
        // ".oca." matches first and is noise; ".sea." must still be found
        assert_eq!(extract_iata("x.oca.sea.example").as_deref(), Some("SEA"));
    }

    #[test]
    fn test_candidates_are_deduplicated() {
        let candidates = iata_candidates("lax1.lax2.example");
        assert_eq!(candidates, vec!["LAX".to_string()]);
    }

    #[test]
    fn test_extracted_codes_are_upper_alpha() {
        for host in [
            "ord1.nflxvideo.net",
            "ipv4-c001-ord001-ix.1.oca.nflxvideo.net",
            "a.b.c.fra3.example.net",
            "edge-ams.example",
        ] {
            for code in iata_candidates(host) {
                assert_eq!(code.len(), 3);
                assert!(code.chars().all(|c| c.is_ascii_uppercase()), "{code}");
            }
        }
    }

    #[test]
    fn test_normalize_iata() {
        assert_eq!(normalize_iata("lax").as_deref(), Some("LAX"));
        assert_eq!(normalize_iata(" Sfo ").as_deref(), Some("SFO"));
        assert_eq!(normalize_iata("la1"), None);
        assert_eq!(normalize_iata("laxx"), None);
        assert_eq!(normalize_iata(""), None);
    }

    #[test]
    fn test_provider_pattern() {
        assert_eq!(
            extract_with_pattern(r"^([a-z]{3})\d+\.", "lax1.nflxvideo.net").as_deref(),
            Some("LAX")
        );
        assert_eq!(extract_with_pattern(r"(", "lax1.nflxvideo.net"), None);
        assert_eq!(extract_with_pattern(r"^(\d+)", "123.example"), None);
    }

    #[test]
    fn test_airport_table() {
        assert_eq!(AIRPORTS.len(), 23);
        let ord = lookup_airport("ord").unwrap();
        assert_eq!(ord.city, "Chicago, IL");
        assert!(lookup_airport("XYZ").is_none());
        for airport in AIRPORTS {
            assert!((-90.0..=90.0).contains(&airport.latitude));
            assert!((-180.0..=180.0).contains(&airport.longitude));
            assert_eq!(normalize_iata(airport.code).as_deref(), Some(airport.code));
        }
    }

    #[test]
    fn test_city_token() {
        assert_eq!(
            extract_city_token("edge.chicago-dc.example.net").as_deref(),
            Some("chicago")
        );
        assert_eq!(
            extract_city_token("cache.dallaspop.example.net").as_deref(),
            Some("dallas")
        );
        assert_eq!(extract_city_token("host-cache.example.net"), None);
    }
}
