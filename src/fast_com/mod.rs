//! Fast.com client: session token and Open Connect candidate list

use crate::locator::types::OcaCandidate;
use crate::retry::Transient;
use async_trait::async_trait;

pub mod client;
pub mod parse;

pub use client::FastComClient;

/// Error type for Fast.com operations
#[derive(Debug, thiserror::Error)]
pub enum FastComError {
    /// HTTP transport or status failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Landing page does not reference the application script
    #[error("could not find the application script in the Fast.com page")]
    ScriptNotFound,

    /// Application script does not contain a token
    #[error("could not find a token in the Fast.com script")]
    TokenNotFound,

    /// Configured or derived URL is not valid
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be configured
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl Transient for FastComError {
    fn is_transient(&self) -> bool {
        match self {
            FastComError::Http(e) => crate::retry::is_transient(e),
            _ => false,
        }
    }
}

/// Source of Open Connect candidates
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Session token for the speed-test API
    async fn token(&self) -> Result<String, FastComError>;

    /// Candidates for this network, one per domain, each resolved
    async fn candidates(&self, token: &str) -> Result<Vec<OcaCandidate>, FastComError>;
}
