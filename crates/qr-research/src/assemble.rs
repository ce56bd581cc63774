//! Attach page content to search hits.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::info;

use qr_core::{EnrichedResult, PageFetcher, ResultSet, SearchHit};

use crate::config::ResearchConfig;

pub struct ResultAssembler {
    fetcher: Arc<dyn PageFetcher>,
    max_concurrent: usize,
}

impl ResultAssembler {
    pub fn new(fetcher: Arc<dyn PageFetcher>, config: &ResearchConfig) -> Self {
        Self {
            fetcher,
            max_concurrent: config.max_concurrent_fetches.max(1),
        }
    }

    /// Fetch every hit's page and pair it with the hit.
    ///
    /// Fetches overlap, but the result set is always in hit order. A failed
    /// fetch leaves that entry's content empty and never fails the batch.
    /// Content is stored untruncated.
    pub async fn assemble(&self, hits: Vec<SearchHit>) -> ResultSet {
        let start = Instant::now();
        let fetcher = self.fetcher.as_ref();

        let results: ResultSet = stream::iter(hits)
            .map(move |hit| async move {
                let content = fetcher.fetch(&hit.url).await;
                EnrichedResult::new(hit, content)
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        info!(
            results = results.len(),
            with_content = results.iter().filter(|r| r.has_content()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Assembled results"
        );
        results
    }
}
