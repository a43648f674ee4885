//! Public IP detection service

use super::providers::{PublicIpError, PublicIpProvider};
use super::PublicIpSource;
use crate::config::LocatorConfig;
use crate::retry::with_retry;
use async_trait::async_trait;
use std::net::IpAddr;

/// Detects the public address of this host over HTTPS
///
/// The configured ipify endpoint is asked first, with retries. The
/// plain-text fallbacks get one attempt each.
#[derive(Debug, Clone)]
pub struct PublicIpClient {
    client: reqwest::Client,
    ipify_url: String,
    max_retries: u32,
    fallbacks: Vec<PublicIpProvider>,
}

impl PublicIpClient {
    /// Create a client from the locator configuration
    pub fn new(config: &LocatorConfig) -> Result<Self, PublicIpError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| PublicIpError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            ipify_url: config.ipify_api_url.clone(),
            max_retries: config.max_retries,
            fallbacks: PublicIpProvider::fallbacks().to_vec(),
        })
    }

    /// Replace the fallback providers tried after ipify
    pub fn with_fallbacks(mut self, fallbacks: Vec<PublicIpProvider>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Ask one provider
    pub async fn from_provider(&self, provider: PublicIpProvider) -> Result<IpAddr, PublicIpError> {
        let url = provider.url().unwrap_or(&self.ipify_url);
        let attempts = match provider {
            PublicIpProvider::Ipify => self.max_retries,
            _ => 1,
        };

        let body = with_retry(attempts, "public IP lookup", move || async move {
            let response = self.client.get(url).send().await?.error_for_status()?;
            Ok::<_, PublicIpError>(response.text().await?)
        })
        .await?;

        provider.parse_body(&body)
    }

    /// Detect the public address, falling back across providers
    pub async fn get_public_ip(&self) -> Result<IpAddr, PublicIpError> {
        let providers = std::iter::once(PublicIpProvider::Ipify).chain(self.fallbacks.iter().copied());
        for provider in providers {
            match self.from_provider(provider).await {
                Ok(ip) => {
                    tracing::debug!("Public IP {ip} from {provider:?}");
                    return Ok(ip);
                }
                Err(e) => tracing::warn!("Public IP provider {provider:?} failed: {e}"),
            }
        }
        Err(PublicIpError::AllProvidersFailed)
    }
}

#[async_trait]
impl PublicIpSource for PublicIpClient {
    async fn public_ip(&self) -> Result<IpAddr, PublicIpError> {
        self.get_public_ip().await
    }
}
