use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::{ExtractError, Result};

/// A fetched listing page.
#[derive(Clone, Debug)]
pub struct FetchedPage {
    /// Final URL after redirects; the base for relative links.
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Supplies HTML to the pipeline. Any failure means "no document".
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// reqwest-backed fetcher with a configured user agent and timeout.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    delay: Duration,
}

impl ReqwestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self {
            client,
            delay: Duration::from_millis(config.delay_ms),
        })
    }
}

#[async_trait]
impl PageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/html")
            .to_string();
        let body = resp.text().await?;
        debug!("Fetched {} ({} bytes, {})", final_url, body.len(), content_type);

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
