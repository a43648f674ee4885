//! Scraping and response parsing for Fast.com

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static SCRIPT_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"<script src="(/app-[a-f0-9]+\.js)""#).ok());

static TOKEN_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"token:\s*"([^"]+)""#).ok());

/// Path of the application script referenced by the landing page
pub fn extract_script_path(html: &str) -> Option<String> {
    let pattern = SCRIPT_PATTERN.as_ref()?;
    Some(pattern.captures(html)?.get(1)?.as_str().to_string())
}

/// API token embedded in the application script
pub fn extract_token(script: &str) -> Option<String> {
    let pattern = TOKEN_PATTERN.as_ref()?;
    Some(pattern.captures(script)?.get(1)?.as_str().to_string())
}

/// Candidate URLs in a speed-test API response
///
/// Accepts the current `{"targets": [{"url": ...}]}` shape, the legacy
/// single `{"url": ...}` shape, a bare list of `{"url": ...}` objects, and
/// as a last resort any https strings or `url` objects found among the
/// top-level values.
pub fn extract_urls(data: &Value) -> Vec<String> {
    fn url_of(item: &Value) -> Option<String> {
        match item {
            Value::Object(map) => map.get("url")?.as_str().map(str::to_string),
            Value::String(s) if s.starts_with("https://") => Some(s.clone()),
            _ => None,
        }
    }

    match data {
        Value::Array(items) => items.iter().filter_map(url_of).collect(),
        Value::Object(map) => {
            if let Some(Value::Array(targets)) = map.get("targets") {
                return targets
                    .iter()
                    .filter_map(|t| t.get("url")?.as_str().map(str::to_string))
                    .collect();
            }
            if let Some(url) = map.get("url").and_then(Value::as_str) {
                return vec![url.to_string()];
            }
            map.values()
                .flat_map(|value| match value {
                    Value::String(_) => url_of(value).into_iter().collect::<Vec<_>>(),
                    Value::Array(items) => items.iter().filter_map(url_of).collect(),
                    _ => Vec::new(),
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

/// Host part of a candidate URL
pub fn candidate_domain(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    // IPv6 literals come back bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']');
    (!host.is_empty()).then(|| host.to_ascii_lowercase())
}

/// `(domain, url)` pairs with one entry per domain, first occurrence kept
pub fn unique_targets(urls: &[String]) -> Vec<(String, String)> {
    let mut targets: Vec<(String, String)> = Vec::new();
    for url in urls {
        let Some(domain) = candidate_domain(url) else {
            tracing::warn!("Skipping unparseable candidate URL {url:?}");
            continue;
        };
        if targets.iter().any(|(d, _)| *d == domain) {
            tracing::debug!("Dropping duplicate candidate {domain}");
            continue;
        }
        targets.push((domain, url.clone()));
    }
    targets
}

/// Token prefix safe to log
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}
