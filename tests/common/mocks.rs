//! Fake providers for testing.
//!
//! These stand in for real embedding and completion backends so pipeline
//! tests run without network access and with fully deterministic vectors.

#![allow(dead_code)]

use async_trait::async_trait;
use ragent::error::ProviderError;
use ragent::llm::{CompletionProvider, EmbeddingProvider};
use ragent::types::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Vocabulary used by [`MockEmbedder::default`].
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "paris", "berlin", "rome", "france", "germany", "italy", "capital", "is", "the", "of",
    "river", "seine", "spree", "tiber",
];

/// Split text into lowercase alphanumeric words.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Mock embedding provider producing bag-of-words vectors.
///
/// Dimension `i` counts occurrences of the `i`-th vocabulary word, so texts
/// sharing more words score higher. Text with no vocabulary words embeds to
/// the zero vector.
///
/// # Examples
///
/// ```
/// use tests::common::mocks::MockEmbedder;
///
/// // Standard vocabulary
/// let embedder = MockEmbedder::default();
///
/// // Later batches finish first
/// let embedder = MockEmbedder::default().with_reverse_delays(Duration::from_millis(10));
///
/// // Always fails
/// let embedder = MockEmbedder::failing();
/// ```
pub struct MockEmbedder {
    vocabulary: Vec<String>,
    should_fail: bool,
    drop_last: bool,
    delay_step: Option<Duration>,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_VOCABULARY)
    }
}

impl MockEmbedder {
    /// Create a mock embedder over the given vocabulary.
    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            should_fail: false,
            drop_last: false,
            delay_step: None,
            calls: AtomicUsize::new(0),
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock embedder that always returns a 503.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Create a mock embedder that returns one vector too few per batch.
    pub fn short_by_one() -> Self {
        Self {
            drop_last: true,
            ..Self::default()
        }
    }

    /// Delay each call so that earlier calls take longer than later ones.
    pub fn with_reverse_delays(mut self, step: Duration) -> Self {
        self.delay_step = Some(step);
        self
    }

    /// The vector this embedder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        for word in words(text) {
            if let Some(i) = self.vocabulary.iter().position(|v| *v == word) {
                vector[i] += 1.0;
            }
        }
        vector
    }

    /// Number of `embed_batch` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every batch received, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(texts.to_vec());

        if let Some(step) = self.delay_step {
            let remaining = 10u32.saturating_sub(call as u32);
            tokio::time::sleep(step * remaining).await;
        }

        if self.should_fail {
            return Err(ProviderError::request(
                "mock-embedder",
                Some(503),
                "Mock embedding failure",
            ));
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        "mock-embedding-model"
    }
}

/// Mock completion provider that records every message sequence it receives.
pub struct MockCompletion {
    reply: Vec<u8>,
    should_fail: bool,
    delay: Option<Duration>,
    received: Mutex<Vec<Vec<Message>>>,
}

impl MockCompletion {
    /// Create a mock completion provider that answers with `reply`.
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.as_bytes().to_vec(),
            should_fail: false,
            delay: None,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock completion provider that always returns a 429.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every message sequence received, in call order.
    pub fn received(&self) -> Vec<Vec<Message>> {
        self.received.lock().unwrap().clone()
    }

    /// The most recent message sequence, if any call was made.
    pub fn last(&self) -> Option<Vec<Message>> {
        self.received.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(&self, messages: &[Message]) -> Result<Vec<u8>, ProviderError> {
        self.received.lock().unwrap().push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.should_fail {
            return Err(ProviderError::request(
                "mock-completion",
                Some(429),
                "Mock rate limit",
            ));
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat-model"
    }
}
