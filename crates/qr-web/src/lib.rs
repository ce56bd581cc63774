//! qr-web: Web clients for quick-research
//!
//! This crate provides the network-facing collaborators of the research
//! pipeline:
//! - Search: ranked hits from the Brave web search API
//! - Page: fetch a result page and reduce it to its readable body text

pub mod brave;
pub mod page;

pub use brave::{parse_search_response, BraveSearchClient, BraveSearchConfig};
pub use page::{extract_body_text, HttpPageFetcher, PageFetchConfig};
