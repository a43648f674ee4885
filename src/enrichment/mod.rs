//! Enrichment of Open Connect candidates
//!
//! Adds the announcing ASN and an approximate location to every candidate,
//! all candidates at once.

pub mod async_service;

pub use async_service::EnrichmentService;
