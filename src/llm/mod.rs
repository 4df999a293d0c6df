//! Provider abstractions.
//!
//! - [`EmbeddingProvider`] - `embed_batch(texts) -> vectors`, same length and order
//! - [`CompletionProvider`] - `complete(messages) -> bytes`
//! - [`CallBudget`] - timeout and cancellation applied around each call
//!
//! Concrete HTTP clients live outside this crate; anything implementing the
//! two traits can drive the pipeline.

/// Timeout and cancellation bounds for provider calls.
pub mod budget;
/// Provider capability traits.
pub mod client;

pub use budget::CallBudget;
pub use client::{CompletionProvider, EmbeddingProvider};
