//! Orchestration of the three research stages.
//!
//! ```text
//! ExtractingQuery -> Searching -> Assembling -> Summarizing -> Done
//!                        \______ no hits ______________________/
//! ```
//!
//! No stage is retried. Search and fetch failures degrade the data;
//! model failures end the run with an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info};

use qr_core::{Error, Message, PageFetcher, Provider, ResultSet, SearchClient};

use crate::assemble::ResultAssembler;
use crate::config::ResearchConfig;
use crate::query::QueryExtractor;
use crate::summarize::Summarizer;

/// Returned in place of a summary when the search yields nothing.
pub const NO_RESULTS: &str = "No results found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ExtractingQuery,
    Searching,
    Assembling,
    Summarizing,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ExtractingQuery => write!(f, "extracting_query"),
            Stage::Searching => write!(f, "searching"),
            Stage::Assembling => write!(f, "assembling"),
            Stage::Summarizing => write!(f, "summarizing"),
            Stage::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Why a run ended with [`NO_RESULTS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NoResultsReason {
    /// The provider answered with zero hits.
    NoHits,
    /// The search request itself failed.
    ProviderFailure(String),
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub task_text: String,
    /// One hit instead of the wider default set.
    pub fast_mode: bool,
    /// Caller-side correlation id, only used in logs.
    pub task_id: u64,
}

impl PipelineRequest {
    pub fn new(task_text: impl Into<String>) -> Self {
        Self {
            task_text: task_text.into(),
            fast_mode: true,
            task_id: 1,
        }
    }

    pub fn with_fast_mode(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }

    pub fn with_task_id(mut self, task_id: u64) -> Self {
        self.task_id = task_id;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    pub task_id: u64,
    pub query: String,
    pub results: ResultSet,
    /// The model's summary, or [`NO_RESULTS`].
    pub summary: String,
    pub no_results: Option<NoResultsReason>,
    pub timings: Vec<StageTiming>,
}

impl ResearchOutcome {
    pub fn total_elapsed(&self) -> Duration {
        self.timings.iter().map(|t| t.elapsed).sum()
    }
}

/// Tracks the current stage and how long each finished stage took.
struct StageClock {
    task_id: u64,
    current: Stage,
    started: Instant,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn start(task_id: u64, stage: Stage) -> Self {
        info!(task_id, stage = %stage, "Pipeline stage");
        Self {
            task_id,
            current: stage,
            started: Instant::now(),
            timings: Vec::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        let elapsed = self.started.elapsed();
        debug!(
            task_id = self.task_id,
            stage = %self.current,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage finished"
        );
        self.timings.push(StageTiming {
            stage: self.current,
            elapsed,
        });
        if next != Stage::Done {
            info!(task_id = self.task_id, stage = %next, "Pipeline stage");
        }
        self.current = next;
        self.started = Instant::now();
    }

    fn finish(mut self) -> Vec<StageTiming> {
        self.advance(Stage::Done);
        self.timings
    }
}

pub struct Pipeline {
    extractor: QueryExtractor,
    search: Arc<dyn SearchClient>,
    assembler: ResultAssembler,
    summarizer: Summarizer,
    config: ResearchConfig,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        search: Arc<dyn SearchClient>,
        fetcher: Arc<dyn PageFetcher>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            extractor: QueryExtractor::new(Arc::clone(&provider), &config),
            search,
            assembler: ResultAssembler::new(fetcher, &config),
            summarizer: Summarizer::new(provider, &config),
            config,
        }
    }

    /// Entry point used by task runners: research `text` and return the
    /// summary or [`NO_RESULTS`].
    ///
    /// `task_memory` and `task_id` are carried for log correlation only.
    pub async fn web_search(
        &self,
        task_memory: &[Message],
        text: &str,
        task_id: u64,
        fast_mode: bool,
    ) -> Result<String, Error> {
        debug!(task_id, memory_messages = task_memory.len(), "Web search requested");
        let request = PipelineRequest::new(text)
            .with_task_id(task_id)
            .with_fast_mode(fast_mode);
        let outcome = self.run(&request).await?;
        Ok(outcome.summary)
    }

    /// Run all stages for one request.
    pub async fn run(&self, request: &PipelineRequest) -> Result<ResearchOutcome, Error> {
        let clock = StageClock::start(request.task_id, Stage::ExtractingQuery);
        let query = self.extractor.extract(&request.task_text).await?;
        self.search_stages(query, request.fast_mode, clock).await
    }

    /// Run search, assembly and summarization for an already known query.
    pub async fn search_and_summarize(
        &self,
        query: &str,
        task_id: u64,
        fast_mode: bool,
    ) -> Result<ResearchOutcome, Error> {
        let clock = StageClock::start(task_id, Stage::Searching);
        self.search_stages(query.to_string(), fast_mode, clock).await
    }

    async fn search_stages(
        &self,
        query: String,
        fast_mode: bool,
        mut clock: StageClock,
    ) -> Result<ResearchOutcome, Error> {
        if clock.current != Stage::Searching {
            clock.advance(Stage::Searching);
        }

        let count = self.config.result_count(fast_mode);
        let hits = match self.search.try_search(&query, count).await {
            Ok(hits) if hits.is_empty() => Err(NoResultsReason::NoHits),
            Ok(hits) => Ok(hits),
            Err(e) => {
                error!(
                    task_id = clock.task_id,
                    query = %query,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Search failed"
                );
                Err(NoResultsReason::ProviderFailure(e.to_string()))
            }
        };

        let hits = match hits {
            Ok(hits) => hits,
            Err(reason) => {
                info!(task_id = clock.task_id, query = %query, reason = ?reason, "No search results");
                return Ok(ResearchOutcome {
                    task_id: clock.task_id,
                    query,
                    results: Vec::new(),
                    summary: NO_RESULTS.to_string(),
                    no_results: Some(reason),
                    timings: clock.finish(),
                });
            }
        };

        clock.advance(Stage::Assembling);
        let results = self.assembler.assemble(hits).await;

        clock.advance(Stage::Summarizing);
        let summary = self.summarizer.summarize(&query, &results).await?;

        let task_id = clock.task_id;
        let timings = clock.finish();
        let outcome = ResearchOutcome {
            task_id,
            query,
            results,
            summary,
            no_results: None,
            timings,
        };
        info!(
            task_id,
            total_ms = outcome.total_elapsed().as_millis() as u64,
            "Research completed"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_core::testing::{MockPageFetcher, MockProvider, MockSearchClient};
    use qr_core::SearchHit;

    struct Harness {
        provider: Arc<MockProvider>,
        search: Arc<MockSearchClient>,
        fetcher: Arc<MockPageFetcher>,
    }

    impl Harness {
        fn new(search: MockSearchClient, fetcher: MockPageFetcher) -> Self {
            Self {
                provider: Arc::new(MockProvider::new()),
                search: Arc::new(search),
                fetcher: Arc::new(fetcher),
            }
        }

        fn pipeline(&self, config: ResearchConfig) -> Pipeline {
            Pipeline::new(
                Arc::clone(&self.provider) as Arc<dyn Provider>,
                Arc::clone(&self.search) as Arc<dyn SearchClient>,
                Arc::clone(&self.fetcher) as Arc<dyn PageFetcher>,
                config,
            )
        }
    }

    fn tokyo_hits() -> Vec<SearchHit> {
        (0..5)
            .map(|n| {
                SearchHit::new(
                    format!("Tokyo source {}", n),
                    format!("https://example.com/tokyo/{}", n),
                    format!("About Tokyo {}", n),
                )
            })
            .collect()
    }

    fn tokyo_pages() -> MockPageFetcher {
        (0..5).fold(MockPageFetcher::new(), |f, n| {
            f.with_page(
                &format!("https://example.com/tokyo/{}", n),
                "Tokyo has a population of about 14 million people.",
            )
        })
    }

    #[tokio::test]
    async fn test_tokyo_scenario_fast_mode() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_response("current population of Tokyo\n");
        h.provider
            .queue_response("Tokyo's population is roughly 14 million residents.");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("find the current population of Tokyo"))
            .await
            .unwrap();

        assert_eq!(outcome.query, "current population of Tokyo");
        assert_eq!(
            h.search.last_call(),
            Some(("current population of Tokyo".to_string(), 1))
        );
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.summary.contains("14 million"));
        assert_eq!(outcome.no_results, None);
        assert_eq!(h.provider.request_count(), 2);

        let stages: Vec<Stage> = outcome.timings.iter().map(|t| t.stage).collect();
        assert_eq!(
            stages,
            vec![
                Stage::ExtractingQuery,
                Stage::Searching,
                Stage::Assembling,
                Stage::Summarizing
            ]
        );
    }

    #[tokio::test]
    async fn test_wide_mode_requests_five() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_response("tokyo population");
        h.provider.queue_response("summary");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("tokyo?").with_fast_mode(false))
            .await
            .unwrap();

        assert_eq!(h.search.last_call().map(|(_, count)| count), Some(5));
        assert_eq!(outcome.results.len(), 5);
        let urls: Vec<&str> = outcome.results.iter().map(|r| r.url()).collect();
        let expected: Vec<String> = tokyo_hits().into_iter().map(|h| h.url).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_empty_search_short_circuits() {
        let h = Harness::new(MockSearchClient::with_hits(Vec::new()), MockPageFetcher::new());
        h.provider.queue_response("obscure query");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("something obscure"))
            .await
            .unwrap();

        assert_eq!(outcome.summary, "No results found");
        assert_eq!(outcome.no_results, Some(NoResultsReason::NoHits));
        assert!(outcome.results.is_empty());
        // Only the extraction call reached the model
        assert_eq!(h.provider.request_count(), 1);
        assert_eq!(h.fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_returns_sentinel() {
        let h = Harness::new(
            MockSearchClient::failing(Error::network("connection refused")),
            MockPageFetcher::new(),
        );
        h.provider.queue_response("tokyo population");

        let summary = h
            .pipeline(ResearchConfig::default())
            .web_search(&[], "find the current population of Tokyo", 1, true)
            .await
            .unwrap();

        assert_eq!(summary, NO_RESULTS);
        assert_eq!(h.provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_reason_recorded() {
        let h = Harness::new(
            MockSearchClient::failing(Error::auth("no search provider credential configured")),
            MockPageFetcher::new(),
        );
        h.provider.queue_response("tokyo population");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("tokyo"))
            .await
            .unwrap();

        match outcome.no_results {
            Some(NoResultsReason::ProviderFailure(message)) => {
                assert!(message.contains("credential"))
            }
            other => panic!("unexpected reason: {:?}", other),
        }
        let stages: Vec<Stage> = outcome.timings.iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec![Stage::ExtractingQuery, Stage::Searching]);
    }

    #[tokio::test]
    async fn test_one_failed_fetch_still_summarizes() {
        let fetcher = (0..5).fold(MockPageFetcher::new(), |f, n| {
            let url = format!("https://example.com/tokyo/{}", n);
            if n == 3 {
                f.with_failure(&url, "timed out")
            } else {
                f.with_page(&url, "Tokyo population text")
            }
        });
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), fetcher);
        h.provider.queue_response("tokyo population");
        h.provider.queue_response("Tokyo is home to about 14 million people.");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("tokyo").with_fast_mode(false))
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 5);
        assert_eq!(outcome.results.iter().filter(|r| r.has_content()).count(), 4);
        assert!(outcome.results[3].content.is_none());
        assert_eq!(outcome.summary, "Tokyo is home to about 14 million people.");

        let prompt = h.provider.request(1).unwrap().messages[1].content.clone();
        assert!(prompt.contains("Title: Tokyo source 3\nContent: No content available"));
    }

    #[tokio::test]
    async fn test_summary_prompt_content_is_capped() {
        let long = "w".repeat(8_000);
        let fetcher = MockPageFetcher::new().with_page("https://example.com/tokyo/0", &long);
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), fetcher);
        h.provider.queue_response("q");
        h.provider.queue_response("summary");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("tokyo"))
            .await
            .unwrap();

        // Stored content stays whole
        assert_eq!(outcome.results[0].content.as_ref().map(String::len), Some(8_000));
        let prompt = h.provider.request(1).unwrap().messages[1].content.clone();
        let content_line = prompt.lines().find(|l| l.starts_with("Content: ")).unwrap();
        assert_eq!(content_line.len() - "Content: ".len(), 5000);
    }

    #[tokio::test]
    async fn test_extraction_failure_is_fatal() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_error(Error::auth("API key not valid"));

        let err = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("tokyo"))
            .await
            .unwrap_err();

        assert!(err.is_auth_error());
        assert_eq!(h.search.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_fallback_uses_task_text() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_error(Error::network("reset"));
        h.provider.queue_response("summary");

        let outcome = h
            .pipeline(ResearchConfig::default().with_fallback_to_input(true))
            .run(&PipelineRequest::new("population of Tokyo"))
            .await
            .unwrap();

        assert_eq!(outcome.query, "population of Tokyo");
        assert_eq!(outcome.summary, "summary");
    }

    #[tokio::test]
    async fn test_summarizer_failure_is_fatal() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_response("tokyo population");
        h.provider.queue_error(Error::api(503, "overloaded"));

        let result = h
            .pipeline(ResearchConfig::default())
            .web_search(&[Message::user("earlier turn")], "tokyo", 7, true)
            .await;

        assert!(matches!(result, Err(Error::Api { status: 503, .. })));
        assert_eq!(h.fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_search_and_summarize_skips_extraction() {
        let h = Harness::new(MockSearchClient::with_hits(tokyo_hits()), tokyo_pages());
        h.provider.queue_response("A short summary.");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .search_and_summarize("tokyo population", 7, true)
            .await
            .unwrap();

        assert_eq!(outcome.task_id, 7);
        assert_eq!(outcome.summary, "A short summary.");
        assert_eq!(h.provider.request_count(), 1);
        assert_eq!(outcome.timings[0].stage, Stage::Searching);
    }

    #[tokio::test]
    async fn test_outcome_serializes() {
        let h = Harness::new(MockSearchClient::with_hits(Vec::new()), MockPageFetcher::new());
        h.provider.queue_response("q");

        let outcome = h
            .pipeline(ResearchConfig::default())
            .run(&PipelineRequest::new("q").with_task_id(42))
            .await
            .unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["task_id"], 42);
        assert_eq!(json["summary"], "No results found");
        assert_eq!(json["no_results"]["kind"], "no_hits");
        assert_eq!(json["timings"][0]["stage"], "extracting_query");
    }
}
