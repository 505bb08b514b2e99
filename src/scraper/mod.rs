pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::FetcherConfig;
use crate::error::FetchError;
use crate::models::RawDocument;
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable page source: one GET per call, failures reported by kind only.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError>;
}

// ── HTTP fetcher ──────────────────────────────────────────────────────────────

pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RawDocument, FetchError> {
        let body = self.client.get_text(url).await?;
        debug!("{}: {} bytes", url, body.len());
        Ok(RawDocument::new(url, body))
    }
}
