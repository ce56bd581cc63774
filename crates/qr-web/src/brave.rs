//! Brave web search client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, trace};

use qr_core::{Error, SearchClient, SearchHit};

pub const DEFAULT_ENDPOINT: &str = "https://api.search.brave.com/res/v1/web/search";

/// Largest `count` the provider accepts.
const MAX_COUNT: usize = 20;

/// Configuration for the Brave search client.
#[derive(Clone, Debug)]
pub struct BraveSearchConfig {
    /// Subscription token. Searches fail soft when this is missing.
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
}

impl BraveSearchConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct BraveSearchClient {
    client: Client,
    config: BraveSearchConfig,
}

impl BraveSearchClient {
    pub fn new(config: BraveSearchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(format!("qr/{}", env!("CARGO_PKG_VERSION")))
                .timeout(config.timeout)
                .build()
                .unwrap_or_default(),
            config,
        }
    }

    fn api_key(&self) -> Result<&str, Error> {
        self.config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::auth("no search provider credential configured"))
    }
}

#[async_trait]
impl SearchClient for BraveSearchClient {
    fn name(&self) -> &str {
        "brave"
    }

    async fn try_search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, Error> {
        let api_key = self.api_key()?;
        let start = Instant::now();
        let count = count.clamp(1, MAX_COUNT).to_string();

        debug!(query, count = %count, endpoint = %self.config.endpoint, "Brave search request");

        let response = self
            .client
            .get(&self.config.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| Error::from_reqwest("Search request failed", &e, e.is_timeout()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => Error::auth(format!("Search provider rejected credential: {}", body)),
                429 => Error::rate_limit(body),
                code => Error::api(code, body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest("Failed to read search response", &e, e.is_timeout()))?;
        trace!(response = %body, "Brave search response payload");

        let hits = parse_search_response(&body)?;

        info!(
            query,
            hits = hits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );
        Ok(hits)
    }
}

#[derive(Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Turn a provider response body into ranked hits.
///
/// A response without `web.results` means no hits. Entries lacking a title
/// or URL are skipped; a missing description becomes an empty string.
pub fn parse_search_response(body: &str) -> Result<Vec<SearchHit>, Error> {
    let response: BraveResponse = serde_json::from_str(body)
        .map_err(|e| Error::parse(format!("Malformed search response: {}", e)))?;

    let results = response.web.map(|web| web.results).unwrap_or_default();

    Ok(results
        .into_iter()
        .filter_map(|r| {
            Some(SearchHit {
                title: r.title?,
                url: r.url?,
                description: r.description.unwrap_or_default(),
            })
        })
        .collect())
}
