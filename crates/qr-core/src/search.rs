//! Search hits, enriched results and the collaborator traits that produce them.
//!
//! Both [`SearchClient`] and [`PageFetcher`] are fail-soft at their public
//! surface: the `try_*` methods carry a tagged `Result` for callers that need
//! to tell an error from an empty answer, while `search`/`fetch` collapse
//! failures into "no hits" and "no content" respectively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::Error;

/// A single ranked record returned by the search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub description: String,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        }
    }
}

/// A hit with the cleaned text of its page attached.
///
/// `content` is `None` when the page could not be fetched. The hit itself is
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub content: Option<String>,
}

impl EnrichedResult {
    pub fn new(hit: SearchHit, content: Option<String>) -> Self {
        Self { hit, content }
    }

    pub fn title(&self) -> &str {
        &self.hit.title
    }

    pub fn url(&self) -> &str {
        &self.hit.url
    }

    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

/// Enriched results in the provider's ranking order.
pub type ResultSet = Vec<EnrichedResult>;

#[async_trait]
pub trait SearchClient: Send + Sync {
    fn name(&self) -> &str;

    /// Run one query against the provider, asking for up to `count` hits.
    async fn try_search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, Error>;

    /// Like [`SearchClient::try_search`], but a failed request yields no hits.
    async fn search(&self, query: &str, count: usize) -> Vec<SearchHit> {
        match self.try_search(query, count).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(provider = self.name(), query, error = %e, "Search request failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Retrieve `url` and return the cleaned body text.
    async fn try_fetch(&self, url: &str) -> Result<String, Error>;

    /// Like [`PageFetcher::try_fetch`], but a failure yields `None`.
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(url, error = %e, "Page fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSearch;

    #[async_trait]
    impl SearchClient for FailingSearch {
        fn name(&self) -> &str {
            "failing"
        }

        async fn try_search(&self, _query: &str, _count: usize) -> Result<Vec<SearchHit>, Error> {
            Err(Error::network("connection refused"))
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn try_fetch(&self, url: &str) -> Result<String, Error> {
            Err(Error::timeout(url.to_string()))
        }
    }

    #[tokio::test]
    async fn test_search_failure_collapses_to_empty() {
        let hits = FailingSearch.search("rust", 5).await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_collapses_to_none() {
        assert_eq!(FailingFetcher.fetch("https://example.com").await, None);
    }

    #[test]
    fn test_enriched_result_keeps_hit() {
        let hit = SearchHit::new("Tokyo", "https://example.com/tokyo", "Capital of Japan");
        let result = EnrichedResult::new(hit.clone(), None);
        assert_eq!(result.hit, hit);
        assert_eq!(result.title(), "Tokyo");
        assert_eq!(result.url(), "https://example.com/tokyo");
        assert!(!result.has_content());
    }

    #[test]
    fn test_enriched_result_serializes_flat() {
        let result = EnrichedResult::new(
            SearchHit::new("T", "https://t.example", "d"),
            Some("body".to_string()),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["title"], "T");
        assert_eq!(value["content"], "body");
    }
}
