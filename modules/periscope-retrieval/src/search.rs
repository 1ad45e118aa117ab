// Policy-parameterized web search capability.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use periscope_common::SearchResult;

use crate::error::{Result, RetrievalError};

/// Parameters for one search invocation. `strict_mode` and `min_sources`
/// carry the geography-driven verification policy down to the capability.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub limit: u32,
    pub scrape_content: bool,
    pub strict_mode: bool,
    pub min_sources: u32,
    pub country_code: Option<String>,
}

/// A source the capability tried and could not reach, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableSource {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// Sources that failed on a run that still succeeded overall.
    pub unreachable: Vec<UnreachableSource>,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome>;
    fn name(&self) -> &str;
}

// --- HTTP implementation ---

#[derive(Debug, Serialize)]
struct ApiSearchRequest<'a> {
    query: &'a str,
    limit: u32,
    scrape_content: bool,
    strict_mode: bool,
    min_sources: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    country_code: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    success: bool,
    #[serde(default)]
    data: Vec<ApiSearchResult>,
    #[serde(default)]
    unreachable_sources: Vec<UnreachableSource>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Search capability over a JSON POST endpoint with an API-key header.
pub struct HttpSearchProvider {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpSearchProvider {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        info!(
            query = %request.query,
            limit = request.limit,
            strict_mode = request.strict_mode,
            min_sources = request.min_sources,
            "Search request"
        );

        let body = ApiSearchRequest {
            query: &request.query,
            limit: request.limit,
            scrape_content: request.scrape_content,
            strict_mode: request.strict_mode,
            min_sources: request.min_sources,
            country_code: request.country_code.as_deref(),
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RetrievalError::SearchFailed {
                message: format!("search request failed: {e}"),
                unreachable: Vec::new(),
            })?;

        let data: ApiSearchResponse =
            resp.json().await.map_err(|e| RetrievalError::SearchFailed {
                message: format!("invalid search response: {e}"),
                unreachable: Vec::new(),
            })?;

        if !data.success {
            return Err(RetrievalError::SearchFailed {
                message: data
                    .error
                    .unwrap_or_else(|| "search returned no usable sources".to_string()),
                unreachable: data.unreachable_sources,
            });
        }

        let results: Vec<SearchResult> = data
            .data
            .into_iter()
            .map(|r| SearchResult {
                url: r.url,
                title: r.title,
                description: r.description,
                text: r.text,
                published_at: r.published_at,
                status: r.status,
            })
            .collect();

        info!(count = results.len(), "Search complete");

        Ok(SearchOutcome {
            results,
            unreachable: data.unreachable_sources,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
