//! qr-providers: Language-model provider implementations for quick-research
//!
//! This crate provides implementations of the Provider trait for LLM APIs.

pub mod gemini;

pub use gemini::GeminiProvider;
