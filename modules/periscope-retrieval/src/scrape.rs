// Single-page scrape capability for a job's custom websites.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, RetrievalError};

/// Main content of one scraped page, rendered to markdown.
#[derive(Debug, Clone)]
pub struct ScrapedSite {
    pub url: String,
    pub title: Option<String>,
    pub markdown: String,
}

#[async_trait]
pub trait SiteScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<ScrapedSite>;
    fn name(&self) -> &str;
}

// --- HTTP implementation ---

#[derive(Debug, Serialize)]
struct ApiScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [&'a str],
    only_main_content: bool,
}

#[derive(Debug, Deserialize)]
struct ApiScrapeResponse {
    success: bool,
    #[serde(default)]
    data: Option<ApiScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiScrapeData {
    #[serde(default)]
    markdown: String,
    #[serde(default)]
    metadata: Option<ApiScrapeMetadata>,
}

#[derive(Debug, Deserialize)]
struct ApiScrapeMetadata {
    #[serde(default)]
    title: Option<String>,
}

/// Scrape capability over a hosted extraction service (markdown out,
/// main-content only).
pub struct HttpScraper {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpScraper {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl SiteScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedSite> {
        let parsed = url::Url::parse(url)
            .map_err(|e| RetrievalError::FetchFailed(format!("invalid URL {url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(RetrievalError::FetchFailed(format!(
                "only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        info!(url, scraper = "http", "Scraping custom site");

        let body = ApiScrapeRequest {
            url,
            formats: &["markdown"],
            only_main_content: true,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::FetchFailed(format!("scrape request failed: {e}")))?;

        let data: ApiScrapeResponse = resp
            .json()
            .await
            .map_err(|e| RetrievalError::FetchFailed(format!("invalid scrape response: {e}")))?;

        if !data.success {
            return Err(RetrievalError::FetchFailed(
                data.error.unwrap_or_else(|| "scrape returned no content".to_string()),
            ));
        }

        let scraped = data
            .data
            .ok_or_else(|| RetrievalError::FetchFailed("scrape response missing data".to_string()))?;

        if scraped.markdown.is_empty() {
            warn!(url, "Scrape returned empty main content");
        }

        Ok(ScrapedSite {
            url: url.to_string(),
            title: scraped.metadata.and_then(|m| m.title),
            markdown: scraped.markdown,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
