//! Embedding store and corpus snapshots.
//!
//! [`EmbeddingStore`] chunks a document and asks the embedding provider for
//! one vector per chunk. The result is frozen into a [`Corpus`], which is
//! never mutated afterwards. [`CorpusHandle`] publishes the current corpus
//! to readers; rebuilding means building a new corpus and swapping the
//! handle, so in-flight searches keep the snapshot they started with.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

use super::chunker::TextChunker;
use crate::error::{RagError, Result};
use crate::llm::{CallBudget, EmbeddingProvider};
use crate::types::Embedding;
use crate::utils::toml_config::RagConfig;

/// Chunk size of a store built without configuration, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Embed `texts` in a single provider call and check the reply shape.
///
/// The provider must answer with exactly one vector per text.
pub async fn embed_checked(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    budget: &CallBudget,
) -> Result<Vec<Vec<f32>>> {
    debug!(
        model = provider.model_name(),
        batch = texts.len(),
        "Requesting embeddings"
    );
    let vectors = budget.run(provider.embed_batch(texts)).await?;

    if vectors.len() != texts.len() {
        return Err(RagError::ProviderContractViolation {
            expected: texts.len(),
            actual: vectors.len(),
        });
    }
    Ok(vectors)
}

/// Fail with [`RagError::InconsistentDimensions`] unless every vector has
/// the width of the first.
fn check_dimensions(embeddings: &[Embedding]) -> Result<()> {
    let Some(first) = embeddings.first() else {
        return Ok(());
    };
    let expected = first.dims();
    match embeddings
        .iter()
        .enumerate()
        .find(|(_, e)| e.dims() != expected)
    {
        Some((index, e)) => Err(RagError::InconsistentDimensions {
            index,
            expected,
            actual: e.dims(),
        }),
        None => Ok(()),
    }
}

/// An immutable set of embeddings sharing one vector width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    embeddings: Vec<Embedding>,
}

impl Corpus {
    /// Build a corpus, rejecting vectors whose width differs from the first.
    pub fn new(embeddings: Vec<Embedding>) -> Result<Self> {
        check_dimensions(&embeddings)?;
        Ok(Self { embeddings })
    }

    pub fn embeddings(&self) -> &[Embedding] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Vector width, or `None` for an empty corpus.
    pub fn dims(&self) -> Option<usize> {
        self.embeddings.first().map(Embedding::dims)
    }
}

/// Builds embeddings for a document through an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct EmbeddingStore {
    provider: Arc<dyn EmbeddingProvider>,
    chunk_size: usize,
    batch_size: usize,
    max_concurrent_batches: usize,
}

impl EmbeddingStore {
    /// A store that sends every chunk of a document in one provider call.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: 0,
            max_concurrent_batches: 1,
        }
    }

    /// A store using the `[chunking]` and `[retrieval]` settings of `config`.
    pub fn from_config(config: &RagConfig, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider)
            .with_chunk_size(config.chunking.chunk_size)
            .with_batching(
                config.retrieval.batch_size,
                config.retrieval.max_concurrent_batches,
            )
    }

    /// Chunk size used by [`ingest`](Self::ingest).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split provider calls into batches of `batch_size` chunks, with up to
    /// `max_concurrent_batches` in flight. A `batch_size` of 0 keeps one call.
    ///
    /// Results are reassembled in chunk order regardless of completion order.
    pub fn with_batching(mut self, batch_size: usize, max_concurrent_batches: usize) -> Self {
        self.batch_size = batch_size;
        self.max_concurrent_batches = max_concurrent_batches.max(1);
        self
    }

    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// Chunk `text` and embed every chunk, preserving chunk order.
    pub async fn embed(&self, text: &str, chunk_size: usize) -> Result<Vec<Embedding>> {
        self.embed_with_budget(text, chunk_size, &CallBudget::default())
            .await
    }

    /// [`embed`](Self::embed) with provider calls bounded by `budget`.
    ///
    /// Every returned vector has the same width.
    pub async fn embed_with_budget(
        &self,
        text: &str,
        chunk_size: usize,
        budget: &CallBudget,
    ) -> Result<Vec<Embedding>> {
        let chunks = TextChunker::new(chunk_size)?.chunk(text);
        debug!(chunks = chunks.len(), chunk_size, "Chunked document");

        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = chunks.into_iter().map(|c| c.text).collect();
        let vectors = self.embed_texts(&texts, budget).await?;

        let embeddings: Vec<Embedding> = texts
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| Embedding { text, vector })
            .collect();
        check_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    /// Embed `text` and freeze the result into a [`Corpus`].
    pub async fn build_corpus(
        &self,
        text: &str,
        chunk_size: usize,
        budget: &CallBudget,
    ) -> Result<Corpus> {
        let embeddings = self.embed_with_budget(text, chunk_size, budget).await?;
        Ok(Corpus { embeddings })
    }

    /// [`build_corpus`](Self::build_corpus) with the store's own chunk size.
    pub async fn ingest(&self, text: &str, budget: &CallBudget) -> Result<Corpus> {
        self.build_corpus(text, self.chunk_size, budget).await
    }

    async fn embed_texts(&self, texts: &[String], budget: &CallBudget) -> Result<Vec<Vec<f32>>> {
        let provider = self.provider.as_ref();

        if self.batch_size == 0 || texts.len() <= self.batch_size {
            return embed_checked(provider, texts, budget).await;
        }

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(self.batch_size))
            .map(|batch| embed_checked(provider, batch, budget))
            .buffered(self.max_concurrent_batches)
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }
}

/// Shared, atomically swappable reference to the current [`Corpus`].
///
/// Readers take a snapshot with [`snapshot`](Self::snapshot) and keep using
/// it for the rest of their request even if the corpus is replaced meanwhile.
#[derive(Debug, Default)]
pub struct CorpusHandle {
    current: ArcSwapOption<Corpus>,
}

impl CorpusHandle {
    /// A handle with no corpus configured.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_corpus(corpus: Corpus) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(corpus),
        }
    }

    /// The corpus in effect right now (lockless read).
    pub fn snapshot(&self) -> Option<Arc<Corpus>> {
        self.current.load_full()
    }

    /// Publish `corpus`, returning the one it replaced.
    pub fn replace(&self, corpus: Corpus) -> Option<Arc<Corpus>> {
        info!(embeddings = corpus.len(), "Publishing new corpus");
        self.current.swap(Some(Arc::new(corpus)))
    }

    /// Remove the corpus; subsequent queries run without retrieval.
    pub fn clear(&self) -> Option<Arc<Corpus>> {
        info!("Clearing corpus");
        self.current.swap(None)
    }
}
