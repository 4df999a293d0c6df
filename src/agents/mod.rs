//! Query orchestration.
//!
//! [`RagAgent`] composes the pipeline for one user turn:
//!
//! 1. snapshot the current corpus and retrieve the best chunks for the query
//! 2. render the prompt template with the retrieved context
//! 3. parse the rendered text into role-tagged messages
//! 4. forward the messages to the completion provider
//!
//! The first failing stage ends the request with an [`AgentError`](crate::error::AgentError)
//! naming that stage.

pub mod rag_agent;

pub use rag_agent::{QueryRequest, RagAgent, CONTEXT_SEPARATOR};
