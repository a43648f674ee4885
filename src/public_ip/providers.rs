//! Public IP providers

use crate::retry::Transient;
use serde::Deserialize;
use std::net::IpAddr;

/// Error type for public IP detection
#[derive(Debug, thiserror::Error)]
pub enum PublicIpError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to parse IP address
    #[error("Failed to parse IP address: {0}")]
    ParseError(String),

    /// All providers failed
    #[error("All public IP providers failed")]
    AllProvidersFailed,

    /// HTTP client could not be configured
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl Transient for PublicIpError {
    fn is_transient(&self) -> bool {
        match self {
            PublicIpError::HttpError(e) => crate::retry::is_transient(e),
            _ => false,
        }
    }
}

/// Public IP provider services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicIpProvider {
    /// ipify.org JSON API, at the configured URL
    #[default]
    Ipify,
    /// AWS checkip service
    AwsCheckIp,
    /// icanhazip.com service
    ICanHazIp,
}

impl PublicIpProvider {
    /// Fixed URL of this provider; ipify's comes from configuration
    pub fn url(&self) -> Option<&'static str> {
        match self {
            PublicIpProvider::Ipify => None,
            PublicIpProvider::AwsCheckIp => Some("https://checkip.amazonaws.com"),
            PublicIpProvider::ICanHazIp => Some("https://icanhazip.com"),
        }
    }

    /// Plain-text providers tried after ipify
    pub fn fallbacks() -> &'static [PublicIpProvider] {
        &[PublicIpProvider::AwsCheckIp, PublicIpProvider::ICanHazIp]
    }

    /// Extract the address from a response body
    ///
    /// ipify answers `{"ip": "..."}`; the others answer with the bare address.
    pub fn parse_body(&self, body: &str) -> Result<IpAddr, PublicIpError> {
        let raw = match self {
            PublicIpProvider::Ipify => {
                #[derive(Deserialize)]
                struct IpifyBody {
                    ip: String,
                }
                serde_json::from_str::<IpifyBody>(body)
                    .map_err(|e| PublicIpError::ParseError(format!("{e}: {body}")))?
                    .ip
            }
            PublicIpProvider::AwsCheckIp | PublicIpProvider::ICanHazIp => body.to_string(),
        };

        let raw = raw.trim();
        raw.parse::<IpAddr>()
            .map_err(|e| PublicIpError::ParseError(format!("{e}: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_urls() {
        assert_eq!(PublicIpProvider::Ipify.url(), None);
        assert_eq!(
            PublicIpProvider::AwsCheckIp.url(),
            Some("https://checkip.amazonaws.com")
        );
        assert_eq!(
            PublicIpProvider::ICanHazIp.url(),
            Some("https://icanhazip.com")
        );
    }

    #[test]
    fn test_default_provider() {
        assert_eq!(PublicIpProvider::default(), PublicIpProvider::Ipify);
        assert!(!PublicIpProvider::fallbacks().contains(&PublicIpProvider::Ipify));
    }

    #[test]
    fn test_parse_ipify_json() {
        let ip = PublicIpProvider::Ipify
            .parse_body(r#"{"ip":"203.0.113.7"}"#)
            .unwrap();
        assert_eq!(ip, "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_parse_plain_text() {
        let ip = PublicIpProvider::AwsCheckIp
            .parse_body("2001:db8::7\n")
            .unwrap();
        assert!(ip.is_ipv6());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            PublicIpProvider::Ipify.parse_body("<html>"),
            Err(PublicIpError::ParseError(_))
        ));
        assert!(matches!(
            PublicIpProvider::ICanHazIp.parse_body("not an ip"),
            Err(PublicIpError::ParseError(_))
        ));
    }
}
