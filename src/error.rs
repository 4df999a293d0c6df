//! Error types for every pipeline stage.
//!
//! Each stage has its own error enum. [`AgentError`] wraps them with the
//! identity of the stage that failed, so callers receive a single terminal
//! error naming both the stage and the cause.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::MessageRole;

/// Failure reported by an embedding or completion provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The backend rejected or failed the request.
    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    Request {
        /// Provider or model identifier.
        provider: String,
        /// Transport status code, if the backend returned one.
        status: Option<u16>,
        /// Backend-supplied detail.
        message: String,
    },

    /// The call exceeded the caller-supplied timeout.
    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled the call.
    #[error("Provider call cancelled")]
    Cancelled,
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {})", code),
        None => String::new(),
    }
}

impl ProviderError {
    /// Shorthand for a [`ProviderError::Request`].
    pub fn request(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        ProviderError::Request {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    ///
    /// Retries are left to the caller; nothing inside the crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Request { status, .. } => match status {
                None => true,
                Some(code) => *code == 408 || *code == 429 || *code >= 500,
            },
            ProviderError::Timeout(_) => true,
            ProviderError::Cancelled => false,
        }
    }
}

/// Which operand of a similarity computation had zero or non-finite norm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateSource {
    /// The query vector.
    Query,
    /// Every vector in the corpus.
    Corpus,
}

impl fmt::Display for DegenerateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateSource::Query => f.write_str("query vector"),
            DegenerateSource::Corpus => f.write_str("every corpus vector"),
        }
    }
}

/// Errors from chunking, embedding and ranking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RagError {
    /// A caller-supplied argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Search was asked to rank an empty corpus.
    #[error("Cannot search an empty corpus")]
    EmptyCorpus,

    /// The provider returned a different number of vectors than texts sent.
    #[error("Provider contract violation: sent {expected} texts, received {actual} vectors")]
    ProviderContractViolation {
        /// Number of texts sent.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },

    /// The provider returned vectors of varying width within one corpus.
    #[error("Provider contract violation: vector {index} has {actual} dimensions, expected {expected}")]
    InconsistentDimensions {
        /// Position of the offending vector.
        index: usize,
        /// Width of the first vector.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },

    /// Query and corpus vectors have different widths.
    #[error("Dimension mismatch: corpus has {expected} dimensions, query has {actual}")]
    DimensionMismatch {
        /// Corpus width.
        expected: usize,
        /// Query width.
        actual: usize,
    },

    /// Cosine similarity is undefined for a zero or non-finite vector.
    #[error("Degenerate vector: {0} has zero or non-finite norm")]
    DegenerateVector(DegenerateSource),

    /// The embedding provider failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Errors from parsing or rendering a prompt template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// The template source is malformed.
    #[error("Template syntax error at byte {offset}: {message}")]
    Syntax {
        /// Byte offset into the template source.
        offset: usize,
        /// What went wrong.
        message: String,
    },

    /// The template references a field the context does not provide.
    #[error("Template execution error: field .{0} is not available")]
    MissingField(String),

    /// A function was called with the wrong number or type of arguments.
    #[error("Template execution error: {0}")]
    Execution(String),
}

impl TemplateError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        TemplateError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// Errors from validating a rendered, role-tagged prompt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Opening and closing tag counts differ for a role.
    #[error("Mismatched tags for role {role}: {open_count} opening, {close_count} closing")]
    UnbalancedTags {
        /// Role whose tags are unbalanced.
        role: MessageRole,
        /// Number of `[role]` tags.
        open_count: usize,
        /// Number of `[/role]` tags.
        close_count: usize,
    },

    /// A tag appears where no span can contain it: an opening tag inside an
    /// open span, or a closing tag that does not close the open span.
    #[error("Misplaced tag {tag} at byte {offset}")]
    MisplacedTag {
        /// The tag as written.
        tag: String,
        /// Byte offset into the rendered prompt.
        offset: usize,
    },
}

/// Agent Orchestrator error, tagged with the stage that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[source] RagError),

    #[error("Prompt rendering failed: {0}")]
    Render(#[source] TemplateError),

    #[error("Prompt parsing failed: {0}")]
    Parse(#[source] ParseError),

    #[error("Completion failed: {0}")]
    Provider(#[source] ProviderError),
}

impl AgentError {
    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            AgentError::Retrieval(_) => "retrieval",
            AgentError::Render(_) => "render",
            AgentError::Parse(_) => "parse",
            AgentError::Provider(_) => "completion",
        }
    }
}

/// Result alias for chunking, embedding and ranking.
pub type Result<T> = std::result::Result<T, RagError>;
