//! qr-core: Core types and traits for quick-research
//!
//! This crate provides the data model shared by the research pipeline
//! (hits, enriched results) and the seams to its external collaborators:
//! the language-model [`Provider`], the [`SearchClient`] and the
//! [`PageFetcher`].

pub mod blocking;
pub mod error;
pub mod message;
pub mod provider;
pub mod search;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use blocking::run_blocking;
pub use error::Error;
pub use message::{Message, Role, Usage};
pub use provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};
pub use search::{EnrichedResult, PageFetcher, ResultSet, SearchClient, SearchHit};

pub type Result<T> = std::result::Result<T, Error>;
