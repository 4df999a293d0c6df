//! # ragent - Retrieval-augmented prompt pipeline
//!
//! Chunk a document, embed the chunks, rank them against a query by cosine
//! similarity, render a role-tagged prompt from a template and hand the
//! parsed messages to a chat-completion backend.
//!
//! Embedding and completion backends are reached only through the
//! [`EmbeddingProvider`] and [`CompletionProvider`] traits, so any HTTP
//! client (or a test fake) can be plugged in.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragent::{CorpusHandle, EmbeddingStore, RagAgent, prompt::DEFAULT_RAG_TEMPLATE};
//! use ragent::llm::CallBudget;
//! use std::sync::Arc;
//!
//! let store = EmbeddingStore::new(embedder.clone());
//! let corpus = store.build_corpus(&document, 1000, &CallBudget::default()).await?;
//! let handle = Arc::new(CorpusHandle::with_corpus(corpus));
//!
//! let agent = RagAgent::new(completion).with_retrieval(embedder, handle);
//! let answer = agent
//!     .handle_user_query(DEFAULT_RAG_TEMPLATE, "Answer briefly.", "What is the capital of France?")
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`agents`] - Query orchestration
//! - [`llm`] - Provider traits and call budgets
//! - [`prompt`] - Template engine and message parser
//! - [`rag`] - Chunking, embedding and similarity search
//! - [`types`] - Shared data types
//! - [`error`] - Error types for every stage
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// Query orchestration over retrieval, prompting and completion.
pub mod agents;
/// Error taxonomy.
pub mod error;
/// Embedding and completion provider abstractions.
pub mod llm;
/// Prompt templates and role-tagged message parsing.
pub mod prompt;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (chunks, embeddings, messages).
pub mod types;
/// Configuration utilities (TOML).
pub mod utils;

// Re-export commonly used types
pub use agents::{QueryRequest, RagAgent};
pub use error::{AgentError, ParseError, ProviderError, RagError, Result, TemplateError};
pub use llm::{CallBudget, CompletionProvider, EmbeddingProvider};
pub use prompt::{parse_messages, Template};
pub use rag::{Corpus, CorpusHandle, EmbeddingStore, Retriever};
pub use types::{Chunk, Embedding, Message, MessageRole, PromptContext};
pub use utils::toml_config::{ConfigError, RagConfig};
