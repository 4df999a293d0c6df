use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Corpus Types =============

/// A contiguous slice of source text produced by the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Position of the chunk within its source text, starting at 0.
    pub index: usize,
}

/// A chunk of text together with the vector the embedding provider produced for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub text: String,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            text: text.into(),
            vector,
        }
    }

    /// Width of the vector.
    pub fn dims(&self) -> usize {
        self.vector.len()
    }
}

// ============= Message Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Every role, in the order tags are validated.
    pub const ALL: [MessageRole; 3] = [
        MessageRole::System,
        MessageRole::User,
        MessageRole::Assistant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// One role-labeled turn handed to a completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============= Prompt Types =============

/// Data a prompt template is rendered against.
///
/// Templates address the fields as `.SystemPrompt`, `.UserQuery`,
/// `.ChatHistory`, `.RAGContext` and `.MaxTokens`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptContext {
    pub system_prompt: String,
    pub user_query: String,
    pub chat_history: String,
    pub rag_context: String,
    /// Global token budget; only read by templates that reference `.MaxTokens`.
    pub max_tokens: Option<f64>,
}

impl PromptContext {
    pub fn new(system_prompt: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    pub fn with_chat_history(mut self, chat_history: impl Into<String>) -> Self {
        self.chat_history = chat_history.into();
        self
    }

    pub fn with_rag_context(mut self, rag_context: impl Into<String>) -> Self {
        self.rag_context = rag_context.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: f64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}
