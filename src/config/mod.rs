//! Configuration for the locator

pub mod defaults;
pub mod settings;

pub use settings::{GeocodingProvider, LocatorConfig, LocatorConfigBuilder};
