//! OCA Locator - find the Netflix Open Connect Appliances serving this network
//!
//! This library asks Fast.com which OCAs it would use for a speed test,
//! then enriches each one with ownership (ASN) and an approximate
//! location, and renders the results for the terminal, files or a map.
//!
//! # Example
//!
//! ```no_run
//! use oca_locator::{LocatorConfig, OcaLocator, Services};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LocatorConfig::default();
//!     let services = Services::new(&config)?;
//!     let result = OcaLocator::from_services(&services).locate().await?;
//!
//!     for oca in result.candidates() {
//!         println!("{} {} {}", oca.domain, oca.ip, oca.location_label());
//!     }
//!     Ok(())
//! }
//! ```

pub mod asn;
pub mod config;
pub mod dns;
pub mod enrichment;
pub mod export;
pub mod fast_com;
pub mod geo;
pub mod locator;
pub mod map;
pub mod public_ip;
pub mod retry;
pub mod services;

// Re-export core types for library users
pub use asn::IspRecord;
pub use config::{GeocodingProvider, LocatorConfig, LocatorConfigBuilder};
pub use export::{export, ExportError, ExportFormat};
pub use geo::{GeoProvider, GeoSource, LocationRecord};
pub use locator::{LocatorError, LocatorResult, OcaCandidate, OcaLocator};
pub use services::Services;
