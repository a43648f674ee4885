//! Public IP detection

use async_trait::async_trait;
use std::net::IpAddr;

pub mod providers;
pub mod service;

pub use providers::{PublicIpError, PublicIpProvider};
pub use service::PublicIpClient;

/// Source of this host's public address
#[async_trait]
pub trait PublicIpSource: Send + Sync {
    /// The public address
    async fn public_ip(&self) -> Result<IpAddr, PublicIpError>;
}

/// A public address supplied by the user instead of detected
#[derive(Debug, Clone, Copy)]
pub struct FixedPublicIp(pub IpAddr);

#[async_trait]
impl PublicIpSource for FixedPublicIp {
    async fn public_ip(&self) -> Result<IpAddr, PublicIpError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_public_ip() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        assert_eq!(FixedPublicIp(ip).public_ip().await.unwrap(), ip);
    }
}
