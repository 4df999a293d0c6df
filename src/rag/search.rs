//! Cosine-similarity ranking over a [`Corpus`].
//!
//! # Degenerate vectors
//!
//! Cosine similarity divides by the product of both norms, so it is
//! undefined when either vector has zero (or non-finite) norm. Such scores
//! are never allowed to reach the sort comparator as `NaN`:
//!
//! - a degenerate **query** vector fails the search with
//!   [`RagError::DegenerateVector`];
//! - a degenerate **corpus** vector is ranked below every scorable one
//!   (score `-inf`), keeping its relative position among other degenerate
//!   entries, and is never returned as a match. If every corpus vector is
//!   degenerate the search fails with [`RagError::DegenerateVector`].
//!
//! # Ordering
//!
//! Ranking is a stable sort by descending score: entries with equal scores
//! keep their corpus order, so the earliest one wins a tie.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use super::embeddings::{embed_checked, Corpus};
use crate::error::{DegenerateSource, RagError, Result};
use crate::llm::{CallBudget, EmbeddingProvider};
use crate::types::Embedding;

/// Cosine similarity of `a` and `b`, or `None` if it is undefined.
///
/// Returns `None` when the lengths differ, either vector is empty, or either
/// norm is zero or non-finite. Accumulates in `f64`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }

    let sim = dot / denom;
    sim.is_finite().then_some(sim)
}

fn is_degenerate(v: &[f32]) -> bool {
    let norm: f64 = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    norm == 0.0 || !norm.is_finite()
}

/// An embedding paired with its score against one query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredEmbedding<'a> {
    pub embedding: &'a Embedding,
    /// Cosine similarity, or `f64::NEG_INFINITY` for a degenerate vector.
    pub score: f64,
}

impl ScoredEmbedding<'_> {
    /// Whether the score is a real similarity rather than the degenerate sentinel.
    pub fn is_scored(&self) -> bool {
        self.score.is_finite()
    }
}

/// Score every embedding against `query` and sort by descending score.
///
/// Fails on an empty input, a query/corpus width mismatch, or a degenerate
/// query vector. The sort is stable.
pub fn rank<'a>(query: &[f32], embeddings: &'a [Embedding]) -> Result<Vec<ScoredEmbedding<'a>>> {
    if embeddings.is_empty() {
        return Err(RagError::EmptyCorpus);
    }
    if is_degenerate(query) {
        return Err(RagError::DegenerateVector(DegenerateSource::Query));
    }

    let mut scored: Vec<ScoredEmbedding<'a>> = Vec::with_capacity(embeddings.len());
    for (index, embedding) in embeddings.iter().enumerate() {
        if embedding.dims() != query.len() {
            return Err(RagError::DimensionMismatch {
                expected: embedding.dims(),
                actual: query.len(),
            });
        }
        let score = match cosine_similarity(query, &embedding.vector) {
            Some(score) => score,
            None => {
                warn!(index, "Degenerate corpus vector ranked last");
                f64::NEG_INFINITY
            }
        };
        scored.push(ScoredEmbedding { embedding, score });
    }

    scored.sort_by(|a, b| compare_desc(a.score, b.score));
    Ok(scored)
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// The `k` best-scoring embeddings, best first.
///
/// Degenerate corpus entries are never returned; fewer than `k` results
/// come back when the corpus is smaller.
pub fn top_k<'a>(query: &[f32], embeddings: &'a [Embedding], k: usize) -> Result<Vec<ScoredEmbedding<'a>>> {
    if k == 0 {
        return Err(RagError::InvalidArgument(
            "top_k must be greater than zero".to_string(),
        ));
    }

    let mut ranked = rank(query, embeddings)?;
    ranked.retain(ScoredEmbedding::is_scored);
    if ranked.is_empty() {
        return Err(RagError::DegenerateVector(DegenerateSource::Corpus));
    }
    ranked.truncate(k);
    Ok(ranked)
}

/// Embeds queries and ranks a corpus against them.
#[derive(Clone)]
pub struct Retriever {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    /// Embed `query` with one provider call returning exactly one vector.
    pub async fn embed_query(&self, query: &str, budget: &CallBudget) -> Result<Vec<f32>> {
        let mut vectors = embed_checked(self.provider.as_ref(), &[query.to_string()], budget).await?;
        Ok(vectors.swap_remove(0))
    }

    /// The best-matching embedding for `query`.
    pub async fn search<'c>(&self, query: &str, corpus: &'c Corpus) -> Result<&'c Embedding> {
        let mut hits = self
            .search_top_k(query, corpus, 1, &CallBudget::default())
            .await?;
        Ok(hits.swap_remove(0).embedding)
    }

    /// The `k` best-matching embeddings for `query`, best first.
    ///
    /// The corpus is checked for emptiness before the provider is called.
    pub async fn search_top_k<'c>(
        &self,
        query: &str,
        corpus: &'c Corpus,
        k: usize,
        budget: &CallBudget,
    ) -> Result<Vec<ScoredEmbedding<'c>>> {
        if corpus.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let query_vec = self.embed_query(query, budget).await?;
        let hits = top_k(&query_vec, corpus.embeddings(), k)?;

        debug!(
            candidates = corpus.len(),
            returned = hits.len(),
            top_score = hits[0].score,
            "Ranked corpus"
        );
        Ok(hits)
    }
}
