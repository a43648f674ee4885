//! Geolocation of candidate servers
//!
//! Every provider answers the same question through [`GeoProvider`]: given a
//! hostname, an optional ASN and an optional address, where is this server?
//! "Not known" is `None`, never an error.

use async_trait::async_trait;

pub mod aleph;
pub mod heuristic;
pub mod hybrid;
pub mod iata;
pub mod location;
pub mod nominatim;

pub use aleph::AlephProvider;
pub use heuristic::DomainHeuristicProvider;
pub use hybrid::HybridResolver;
pub use location::{FallbackAnnotations, GeoSource, LocationRecord};

/// Netflix's own autonomous system number
pub const NETFLIX_ASN: &str = "2906";

/// Name Team Cymru reports for [`NETFLIX_ASN`]
pub const NETFLIX_AS_NAME: &str = "AS-SSI";

/// A source of approximate server locations
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Locate `domain`, optionally helped by its ASN and address
    ///
    /// Network failures and unparseable responses yield `None`.
    async fn resolve(
        &self,
        domain: &str,
        asn: Option<&str>,
        ip: Option<&str>,
    ) -> Option<LocationRecord>;

    /// Short provider name for logs
    fn name(&self) -> &'static str;
}

/// Errors raised inside provider implementations
///
/// They never leave a provider; [`GeoProvider::resolve`] logs them and
/// returns `None`.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// HTTP transport or status failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not the JSON we expected
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP client could not be configured
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl crate::retry::Transient for GeoError {
    fn is_transient(&self) -> bool {
        match self {
            GeoError::Http(e) => crate::retry::is_transient(e),
            _ => false,
        }
    }
}
