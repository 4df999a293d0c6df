//! Provider capability traits.
//!
//! The pipeline never talks to a vendor API directly. It depends on two
//! narrow capabilities, one for embeddings and one for chat completions,
//! so any backend (or a deterministic fake in tests) can be plugged in.

use crate::error::ProviderError;
use crate::types::Message;
use async_trait::async_trait;

/// Turns texts into vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order, all of the same width. The embedding store checks this and treats
/// a violation as fatal.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts in one backend call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Generates a reply for an ordered sequence of role-labeled messages.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete the conversation, returning the raw reply body.
    async fn complete(&self, messages: &[Message]) -> Result<Vec<u8>, ProviderError>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}
