use std::time::{Duration, Instant};

use tracing::debug;

use qr_core::{CompletionRequest, CompletionResponse, Error, Provider};

/// Run one completion with an upper bound on its duration.
pub(crate) async fn complete_with_timeout(
    provider: &dyn Provider,
    request: CompletionRequest,
    timeout: Duration,
    stage: &str,
) -> Result<CompletionResponse, Error> {
    let start = Instant::now();

    let response = tokio::time::timeout(timeout, provider.complete(request))
        .await
        .map_err(|_| {
            Error::timeout(format!(
                "{} model call did not finish within {}ms",
                stage,
                timeout.as_millis()
            ))
        })??;

    debug!(
        stage,
        provider = provider.name(),
        model = %response.model,
        finish_reason = ?response.finish_reason,
        completion_tokens = response.usage.completion_tokens,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Model call completed"
    );

    Ok(response)
}
