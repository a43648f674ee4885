//! HTTP client for Fast.com

use super::parse::{extract_script_path, extract_token, extract_urls, redact_token, unique_targets};
use super::{CandidateSource, FastComError};
use crate::config::LocatorConfig;
use crate::dns::DnsResolver;
use crate::locator::types::OcaCandidate;
use crate::retry::with_retry;
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;

/// Fast.com client
///
/// # Examples
///
/// ```no_run
/// use oca_locator::config::LocatorConfig;
/// use oca_locator::dns::DnsResolver;
/// use oca_locator::fast_com::FastComClient;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = FastComClient::new(&LocatorConfig::default(), Arc::new(DnsResolver::new()))?;
///
///     let token = client.get_token().await?;
///     for candidate in client.fetch_candidates(&token).await? {
///         println!("{} {}", candidate.domain, candidate.ip);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FastComClient {
    client: reqwest::Client,
    page_url: String,
    api_url: String,
    url_count: u8,
    max_retries: u32,
    dns: Arc<DnsResolver>,
}

impl FastComClient {
    /// Create a client from the locator configuration
    pub fn new(config: &LocatorConfig, dns: Arc<DnsResolver>) -> Result<Self, FastComError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| FastComError::ClientBuild(e.to_string()))?;
        Ok(Self {
            client,
            page_url: config.fast_com_url.clone(),
            api_url: config.fast_com_api_url.clone(),
            url_count: config.url_count,
            max_retries: config.max_retries,
            dns,
        })
    }

    /// Scrape a session token from the landing page's application script
    pub async fn get_token(&self) -> Result<String, FastComError> {
        let page_url = url::Url::parse(&self.page_url)
            .map_err(|e| FastComError::InvalidUrl(format!("{}: {e}", self.page_url)))?;

        let token = with_retry(self.max_retries, "Fast.com token", move || {
            let page_url = page_url.clone();
            async move {
                let html = self
                    .client
                    .get(page_url.clone())
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;

                let script_path = extract_script_path(&html).ok_or(FastComError::ScriptNotFound)?;
                let script_url = page_url
                    .join(&script_path)
                    .map_err(|e| FastComError::InvalidUrl(format!("{script_path}: {e}")))?;
                tracing::debug!("Fast.com script: {script_url}");

                let script = self
                    .client
                    .get(script_url)
                    .send()
                    .await?
                    .error_for_status()?
                    .text()
                    .await?;

                extract_token(&script).ok_or(FastComError::TokenNotFound)
            }
        })
        .await?;

        tracing::debug!("Fast.com token: {}", redact_token(&token));
        Ok(token)
    }

    /// Fetch candidate URLs, de-duplicate by domain and resolve each domain
    ///
    /// Domains that fail to resolve are skipped.
    pub async fn fetch_candidates(&self, token: &str) -> Result<Vec<OcaCandidate>, FastComError> {
        let url_count = self.url_count.to_string();
        let url_count = url_count.as_str();
        let data: Value = with_retry(self.max_retries, "Fast.com candidates", move || async move {
            let response = self
                .client
                .get(&self.api_url)
                .query(&[("https", "true"), ("token", token), ("urlCount", url_count)])
                .send()
                .await?
                .error_for_status()?;
            Ok::<_, FastComError>(response.json::<Value>().await?)
        })
        .await?;

        let urls = extract_urls(&data);
        tracing::debug!("Fast.com returned {} candidate URLs", urls.len());

        let resolutions = unique_targets(&urls).into_iter().map(|(domain, url)| async move {
            match self.dns.resolve(&domain).await {
                Ok(ip) => Some(OcaCandidate::new(domain, ip, url)),
                Err(e) => {
                    tracing::warn!("Failed to resolve {domain}: {e}");
                    None
                }
            }
        });

        let candidates: Vec<OcaCandidate> = join_all(resolutions).await.into_iter().flatten().collect();
        tracing::info!("Retrieved {} OCA candidates", candidates.len());
        Ok(candidates)
    }
}

#[async_trait]
impl CandidateSource for FastComClient {
    async fn token(&self) -> Result<String, FastComError> {
        self.get_token().await
    }

    async fn candidates(&self, token: &str) -> Result<Vec<OcaCandidate>, FastComError> {
        self.fetch_candidates(token).await
    }
}
