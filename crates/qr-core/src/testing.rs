//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::Error;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
use crate::search::{PageFetcher, SearchClient, SearchHit};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
    /// Artificial latency applied to every complete() call.
    pub delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a response to be returned by the next complete() call.
    /// Responses are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        let response = CompletionResponse {
            message: Message::assistant(content),
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::Stop,
        };
        self.responses.lock().unwrap().insert(0, Ok(response));
    }

    /// Queue an error for the next complete() call.
    pub fn queue_error(&self, error: Error) {
        self.responses.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }

    /// Get the captured request at `index` (call order).
    pub fn request(&self, index: usize) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().get(index).cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop();
        match next {
            Some(response) => response,
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}

/// A mock search client returning a fixed hit list, or failing.
pub struct MockSearchClient {
    outcome: Mutex<Option<Result<Vec<SearchHit>, Error>>>,
    hits: Vec<SearchHit>,
    /// Captured (query, count) pairs.
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl MockSearchClient {
    /// Always answers with `hits`, truncated to the requested count.
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            outcome: Mutex::new(None),
            hits,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fails the next call with `error`, then answers with no hits.
    pub fn failing(error: Error) -> Self {
        Self {
            outcome: Mutex::new(Some(Err(error))),
            hits: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<(String, usize)> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SearchClient for MockSearchClient {
    fn name(&self) -> &str {
        "mock-search"
    }

    async fn try_search(&self, query: &str, count: usize) -> Result<Vec<SearchHit>, Error> {
        self.calls.lock().unwrap().push((query.to_string(), count));
        if let Some(outcome) = self.outcome.lock().unwrap().take() {
            return outcome;
        }
        Ok(self.hits.iter().take(count).cloned().collect())
    }
}

/// A mock page fetcher serving canned pages by URL.
///
/// Unknown URLs fail with a network error. Each page may carry a delay so
/// tests can make fetches complete out of order.
pub struct MockPageFetcher {
    pages: HashMap<String, (Result<String, String>, Duration)>,
    /// URLs in the order fetches were started.
    pub requested: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            requested: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.pages
            .insert(url.to_string(), (Ok(text.to_string()), Duration::ZERO));
        self
    }

    pub fn with_delayed_page(mut self, url: &str, text: &str, delay: Duration) -> Self {
        self.pages.insert(url.to_string(), (Ok(text.to_string()), delay));
        self
    }

    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.pages
            .insert(url.to_string(), (Err(message.to_string()), Duration::ZERO));
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn try_fetch(&self, url: &str) -> Result<String, Error> {
        self.requested.lock().unwrap().push(url.to_string());
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = match self.pages.get(url) {
            Some((page, delay)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(*delay).await;
                }
                page.clone().map_err(Error::network)
            }
            None => Err(Error::network(format!("no page for {}", url))),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
