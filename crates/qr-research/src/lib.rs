//! qr-research: the search-and-summarize pipeline
//!
//! Free-form task text goes through three stages:
//! 1. [`QueryExtractor`] asks the model for a concise search query
//! 2. the search client and [`ResultAssembler`] build an ordered result set
//! 3. [`Summarizer`] condenses the result set into prose
//!
//! [`Pipeline`] sequences the stages and applies the failure policy:
//! search and fetch failures degrade the data, model failures abort.

pub mod assemble;
pub mod config;
mod llm;
pub mod pipeline;
pub mod prompt;
pub mod query;
pub mod summarize;

pub use assemble::ResultAssembler;
pub use config::ResearchConfig;
pub use pipeline::{
    NoResultsReason, Pipeline, PipelineRequest, ResearchOutcome, Stage, StageTiming, NO_RESULTS,
};
pub use query::QueryExtractor;
pub use summarize::Summarizer;
