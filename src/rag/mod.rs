//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Fixed-size character chunking
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding store, corpus snapshots and swapping
//! - [`rag::search`](crate::rag::search) - Cosine-similarity ranking (top-1 and top-K)
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - The document is chunked and every chunk embedded in one batch
//! 2. **Publication** - The embeddings are frozen into a [`Corpus`] and published through a [`CorpusHandle`]
//! 3. **Retrieval** - The query is embedded and the corpus ranked against it
//!
//! # Example
//!
//! ```ignore
//! use ragent::rag::{EmbeddingStore, Retriever, CorpusHandle};
//! use ragent::llm::CallBudget;
//!
//! let store = EmbeddingStore::new(provider.clone());
//! let corpus = store.build_corpus(&document_text, 1000, &CallBudget::default()).await?;
//!
//! let handle = CorpusHandle::with_corpus(corpus);
//! let snapshot = handle.snapshot().expect("corpus configured");
//!
//! let retriever = Retriever::new(provider);
//! let best = retriever.search("What were the conclusions?", &snapshot).await?;
//! println!("{}", best.text);
//! ```

pub mod chunker;
pub mod embeddings;
pub mod search;

pub use chunker::{chunk, TextChunker};
pub use embeddings::{Corpus, CorpusHandle, EmbeddingStore};
pub use search::{cosine_similarity, rank, top_k, Retriever, ScoredEmbedding};
