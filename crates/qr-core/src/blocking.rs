//! Blocking utilities for CPU-intensive operations.
//!
//! HTML parsing of fetched pages is offloaded to Tokio's blocking
//! threadpool so that a large document does not stall the other fetches
//! running on the async runtime.

use crate::Error;

/// Execute a CPU-intensive closure on Tokio's blocking threadpool.
pub async fn run_blocking<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Unknown(format!("Blocking task failed: {}", e)))
}
