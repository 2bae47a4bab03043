//! HTTP page fetching

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::download::{RetryPolicy, retry};
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("khdl/", env!("CARGO_PKG_VERSION"));

/// Source of HTML pages
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return the response body as text
    async fn fetch_html(&self, url: &Url) -> Result<String>;

    /// Whether `url` answers a HEAD request with success; never retried
    async fn exists(&self, url: &Url) -> bool;
}

/// Build the HTTP client shared by page fetches and file downloads
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::fetch("<client>", e))
}

/// `reqwest`-backed fetcher that retries transport failures
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(http_client: Client, retry: RetryPolicy) -> Self {
        Self { http_client, retry }
    }

    async fn fetch_once(&self, url: &Url) -> Result<String> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(url.as_str(), format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::fetch(url.as_str(), e))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!("Fetching page: {}", url);
        let what = format!("fetch {}", url);
        retry(&self.retry, &what, |_| self.fetch_once(url)).await.result
    }

    async fn exists(&self, url: &Url) -> bool {
        match self.http_client.head(url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }
}
