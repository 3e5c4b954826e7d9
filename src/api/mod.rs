use std::path::Path;
use std::time::Duration;

use crate::error::ScrapeResult;
use crate::models::Config;

pub mod links;
pub mod spimex_client;
pub use links::extract_xls_links;
pub use spimex_client::SpimexClient;

/// Bounded retry with exponential delay for network calls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.retry_max_attempts,
            config.retry_base_delay,
            config.retry_max_delay,
        )
    }

    /// Delay before the attempt following failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    pub async fn wait(&self, attempt: u32) {
        tokio::time::sleep(self.delay_for(attempt)).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// Source of listing pages and report files
#[async_trait::async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch one listing page; `None` when the request failed or the server answered with
    /// an error status, and the caller should poll again
    async fn fetch_listing(&self, page: u32) -> Option<String>;

    /// Download a report link into `destination`, retrying network failures
    async fn download_report(&self, link: &str, destination: &Path) -> ScrapeResult<()>;
}
