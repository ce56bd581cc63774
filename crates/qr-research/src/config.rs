//! Tunables for the research pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Model used for both generative stages unless overridden.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_query_max_tokens() -> u32 {
    100
}

fn default_summary_max_tokens() -> u32 {
    500
}

fn default_content_limit() -> usize {
    5000
}

fn default_fast_count() -> usize {
    1
}

fn default_wide_count() -> usize {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_llm_timeout_secs() -> u64 {
    60
}

fn default_max_concurrent_fetches() -> usize {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Model identifier for query extraction.
    #[serde(default = "default_model")]
    pub query_model: String,

    /// Generated-token cap for query extraction.
    #[serde(default = "default_query_max_tokens")]
    pub query_max_tokens: u32,

    /// Model identifier for summarization.
    #[serde(default = "default_model")]
    pub summary_model: String,

    /// Generated-token cap for summarization.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Characters of page content per result placed in the summary prompt.
    #[serde(default = "default_content_limit")]
    pub content_limit: usize,

    /// Hits requested in fast mode.
    #[serde(default = "default_fast_count")]
    pub fast_count: usize,

    /// Hits requested otherwise.
    #[serde(default = "default_wide_count")]
    pub wide_count: usize,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Upper bound on each model call.
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// Pages fetched at the same time while assembling results.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Use the task text itself as the query when extraction fails.
    #[serde(default)]
    pub fallback_to_input: bool,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            query_model: default_model(),
            query_max_tokens: default_query_max_tokens(),
            summary_model: default_model(),
            summary_max_tokens: default_summary_max_tokens(),
            content_limit: default_content_limit(),
            fast_count: default_fast_count(),
            wide_count: default_wide_count(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            llm_timeout_secs: default_llm_timeout_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            fallback_to_input: false,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one model for both generative stages.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.query_model = model.clone();
        self.summary_model = model;
        self
    }

    pub fn with_fallback_to_input(mut self, fallback: bool) -> Self {
        self.fallback_to_input = fallback;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, max: usize) -> Self {
        self.max_concurrent_fetches = max;
        self
    }

    /// Number of hits to request from the search provider.
    pub fn result_count(&self, fast_mode: bool) -> usize {
        if fast_mode {
            self.fast_count
        } else {
            self.wide_count
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}
