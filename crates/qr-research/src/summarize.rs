//! Condense an assembled result set into a prose summary.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use qr_core::{CompletionRequest, EnrichedResult, Error, Provider};

use crate::config::ResearchConfig;
use crate::llm::complete_with_timeout;
use crate::prompt::{summary_prompt, summary_system_prompt};

pub struct Summarizer {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    content_limit: usize,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(provider: Arc<dyn Provider>, config: &ResearchConfig) -> Self {
        Self {
            provider,
            model: config.summary_model.clone(),
            max_tokens: config.summary_max_tokens,
            content_limit: config.content_limit,
            timeout: config.llm_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_request(&self, query: &str, results: &[EnrichedResult]) -> CompletionRequest {
        CompletionRequest::instructed(
            summary_system_prompt(query),
            summary_prompt(query, results, self.content_limit),
        )
        .with_model(self.model.as_str())
        .with_max_tokens(self.max_tokens)
    }

    /// Summarize `results` with respect to `query`.
    ///
    /// Callers handle the empty result set themselves; this always makes
    /// exactly one model call.
    pub async fn summarize(&self, query: &str, results: &[EnrichedResult]) -> Result<String, Error> {
        let start = Instant::now();
        let request = self.build_request(query, results);

        let response =
            complete_with_timeout(self.provider.as_ref(), request, self.timeout, "summarization")
                .await?;

        if response.text().trim().is_empty() {
            return Err(Error::empty_response("model returned an empty summary"));
        }

        info!(
            results = results.len(),
            summary_chars = response.text().chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summarized results"
        );
        Ok(response.message.content)
    }
}
