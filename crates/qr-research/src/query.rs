//! Search query inference from free-form task text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use qr_core::{CompletionRequest, Error, Provider};

use crate::config::ResearchConfig;
use crate::llm::complete_with_timeout;
use crate::prompt::{query_prompt, QUERY_SYSTEM_PROMPT};

pub struct QueryExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    fallback_to_input: bool,
}

impl QueryExtractor {
    pub fn new(provider: Arc<dyn Provider>, config: &ResearchConfig) -> Self {
        Self {
            provider,
            model: config.query_model.clone(),
            max_tokens: config.query_max_tokens,
            timeout: config.llm_timeout(),
            fallback_to_input: config.fallback_to_input,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build_request(&self, task_text: &str) -> CompletionRequest {
        CompletionRequest::instructed(QUERY_SYSTEM_PROMPT, query_prompt(task_text))
            .with_model(self.model.as_str())
            .with_max_tokens(self.max_tokens)
    }

    /// Infer the search query for `task_text`.
    ///
    /// A failed or empty model answer is an error unless the extractor was
    /// configured to fall back to the task text itself.
    pub async fn extract(&self, task_text: &str) -> Result<String, Error> {
        match self.infer(task_text).await {
            Ok(query) => Ok(query),
            Err(e) if self.fallback_to_input && !task_text.trim().is_empty() => {
                warn!(error = %e, "Query extraction failed, using task text as query");
                Ok(task_text.trim().to_string())
            }
            Err(e) => Err(e),
        }
    }

    async fn infer(&self, task_text: &str) -> Result<String, Error> {
        let start = Instant::now();
        let response = complete_with_timeout(
            self.provider.as_ref(),
            self.build_request(task_text),
            self.timeout,
            "query extraction",
        )
        .await?;

        let query = response.text().trim();
        if query.is_empty() {
            return Err(Error::empty_response("model returned no search query"));
        }

        info!(
            query,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Inferred search query"
        );
        Ok(query.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qr_core::testing::MockProvider;
    use qr_core::Role;

    fn extractor(provider: &Arc<MockProvider>, config: &ResearchConfig) -> QueryExtractor {
        QueryExtractor::new(Arc::clone(provider) as Arc<dyn Provider>, config)
    }

    #[tokio::test]
    async fn test_extract_trims_model_output() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("  current population of Tokyo \n");

        let query = extractor(&provider, &ResearchConfig::default())
            .extract("find the current population of Tokyo")
            .await
            .unwrap();
        assert_eq!(query, "current population of Tokyo");
    }

    #[tokio::test]
    async fn test_extract_request_shape() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("rust async runtimes");

        extractor(&provider, &ResearchConfig::default())
            .extract("what async runtimes exist for rust?")
            .await
            .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.model.as_deref(), Some("gemini-2.5-flash-lite"));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[0].content, QUERY_SYSTEM_PROMPT);
        assert!(request.messages[1]
            .content
            .contains("\"\"\"what async runtimes exist for rust?\"\"\""));
    }

    #[tokio::test]
    async fn test_extract_model_failure_propagates() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_error(Error::rate_limit("quota"));

        let err = extractor(&provider, &ResearchConfig::default())
            .extract("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimit(_)));
    }

    #[tokio::test]
    async fn test_extract_empty_output_is_error() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("   \n ");

        let err = extractor(&provider, &ResearchConfig::default())
            .extract("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyResponse(_)));
    }

    #[tokio::test]
    async fn test_extract_fallback_to_input() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_error(Error::network("connection reset"));
        let config = ResearchConfig::default().with_fallback_to_input(true);

        let query = extractor(&provider, &config)
            .extract("  tokyo population  ")
            .await
            .unwrap();
        assert_eq!(query, "tokyo population");
    }

    #[tokio::test]
    async fn test_extract_timeout() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(500)));
        provider.queue_response("too late");

        let err = extractor(&provider, &ResearchConfig::default())
            .with_timeout(Duration::from_millis(20))
            .extract("anything")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
