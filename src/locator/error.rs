//! Errors that abort a locator run

use crate::fast_com::FastComError;
use crate::public_ip::PublicIpError;

/// Fatal failures of [`super::OcaLocator::locate`]
///
/// Everything else degrades to missing fields on the result.
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// The public address could not be determined
    #[error("could not determine the public IP address: {0}")]
    PublicIp(#[source] PublicIpError),

    /// No Fast.com token could be obtained
    #[error("could not obtain a Fast.com token: {0}")]
    Token(#[source] FastComError),

    /// The candidate list could not be fetched
    #[error("could not fetch OCA candidates from Fast.com: {0}")]
    Candidates(#[source] FastComError),

    /// A component could not be constructed
    #[error("failed to initialise {component}: {reason}")]
    Setup {
        /// Component name
        component: &'static str,
        /// Underlying error
        reason: String,
    },
}
