use reqwest::{Client, StatusCode};
use std::path::Path;
use tracing::{debug, error, info, warn};
use url::Url;

use super::{ReportSource, RetryPolicy};
use crate::error::{ScrapeError, ScrapeResult};
use crate::models::Config;

/// HTTP client for the exchange's trading-results archive
pub struct SpimexClient {
    client: Client,
    listing_url: String,
    download_base: Url,
    retry_policy: RetryPolicy,
}

impl SpimexClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> ScrapeResult<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent("spimex-scraper/0.1")
            .build()?;

        Ok(Self {
            client,
            listing_url: config.listing_url.clone(),
            download_base: Url::parse(&config.download_base)?,
            retry_policy: RetryPolicy::from_config(config),
        })
    }

    /// Listing page URL: the page number is appended to the base as-is
    pub fn listing_url(&self, page: u32) -> String {
        format!("{}{}", self.listing_url, page)
    }

    /// Absolute download URL for a relative report link
    pub fn download_url(&self, link: &str) -> ScrapeResult<Url> {
        Ok(self.download_base.join(link)?)
    }

    /// One download attempt; anything but 200 counts as a failure
    async fn try_download(&self, url: &Url) -> ScrapeResult<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;

        if response.status() != StatusCode::OK {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl ReportSource for SpimexClient {
    async fn fetch_listing(&self, page: u32) -> Option<String> {
        let url = self.listing_url(page);
        info!("📄 Fetching listing page {}: {}", page, url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Connection to {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Listing page {} answered with status {}", page, response.status());
            return None;
        }

        match response.text().await {
            Ok(html) => Some(html),
            Err(e) => {
                warn!("Failed to read listing page {}: {}", page, e);
                None
            }
        }
    }

    async fn download_report(&self, link: &str, destination: &Path) -> ScrapeResult<()> {
        let url = self.download_url(link)?;
        let mut attempt = 0;

        let payload = loop {
            attempt += 1;
            match self.try_download(&url).await {
                Ok(payload) => break payload,
                Err(e) if self.retry_policy.should_retry(attempt) => {
                    let delay = self.retry_policy.delay_for(attempt);
                    warn!(
                        "Download of {} failed (attempt {}/{}): {}. Retrying in {:?}",
                        url, attempt, self.retry_policy.max_attempts, e, delay
                    );
                    self.retry_policy.wait(attempt).await;
                }
                Err(e) => {
                    error!("❌ Download of {} failed after {} attempts: {}", url, attempt, e);
                    return Err(ScrapeError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt,
                    });
                }
            }
        };

        tokio::fs::write(destination, &payload).await?;
        debug!("Saved {} bytes from {} to {}", payload.len(), url, destination.display());
        Ok(())
    }
}
