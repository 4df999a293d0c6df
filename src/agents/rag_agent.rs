use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::AgentError;
use crate::llm::{CallBudget, CompletionProvider, EmbeddingProvider};
use crate::prompt::{escape_tags, format_messages, parse_messages, Template, TokenBudget};
use crate::rag::{CorpusHandle, Retriever};
use crate::types::{Message, PromptContext};
use crate::utils::toml_config::RagConfig;

/// Separator placed between retrieved chunks in `.RAGContext`.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// One user turn to answer.
///
/// The query and history are untrusted: role tags inside them reach the
/// provider as text. The system prompt is inserted as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub system_prompt: String,
    pub user_query: String,
    /// Earlier turns, rendered into `.ChatHistory` with the message tag grammar.
    pub history: Vec<Message>,
    /// Overrides the agent's `.MaxTokens` for this request.
    pub max_tokens: Option<f64>,
}

impl QueryRequest {
    pub fn new(system_prompt: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: f64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Answers user queries: retrieve context, render the prompt, parse it into
/// messages and forward them to the completion provider.
///
/// Each stage runs only if the previous one succeeded. Retrieval is skipped
/// (empty `.RAGContext`) when no embedding provider is attached or the corpus
/// handle holds no corpus. Retrieved chunks are escaped like the query.
pub struct RagAgent {
    completion: Arc<dyn CompletionProvider>,
    retriever: Option<Retriever>,
    corpus: Arc<CorpusHandle>,
    top_k: usize,
    token_budget: TokenBudget,
    max_tokens: Option<f64>,
    call_budget: CallBudget,
}

impl RagAgent {
    /// An agent without retrieval.
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            completion,
            retriever: None,
            corpus: Arc::new(CorpusHandle::new()),
            top_k: 1,
            token_budget: TokenBudget::default(),
            max_tokens: None,
            call_budget: CallBudget::default(),
        }
    }

    /// An agent configured from `config`, retrieving through `embedder`.
    pub fn from_config(
        config: &RagConfig,
        completion: Arc<dyn CompletionProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        corpus: Arc<CorpusHandle>,
    ) -> Self {
        let mut agent = Self::new(completion)
            .with_retrieval(embedder, corpus)
            .with_top_k(config.retrieval.top_k)
            .with_token_budget(config.token_budget())
            .with_call_budget(config.call_budget());
        agent.max_tokens = config.prompt.max_tokens;
        agent
    }

    /// Retrieve from whatever corpus `corpus` holds when a query arrives.
    pub fn with_retrieval(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        corpus: Arc<CorpusHandle>,
    ) -> Self {
        self.retriever = Some(Retriever::new(embedder));
        self.corpus = corpus;
        self
    }

    /// Number of chunks joined into `.RAGContext`. Clamped to at least 1.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_token_budget(mut self, token_budget: TokenBudget) -> Self {
        self.token_budget = token_budget;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: f64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Budget used by calls that don't pass their own.
    pub fn with_call_budget(mut self, call_budget: CallBudget) -> Self {
        self.call_budget = call_budget;
        self
    }

    pub fn corpus(&self) -> &Arc<CorpusHandle> {
        &self.corpus
    }

    /// Answer `user_query` with a template given as source text.
    pub async fn handle_user_query(
        &self,
        prompt_template: &str,
        system_prompt: &str,
        user_query: &str,
    ) -> Result<Vec<u8>, AgentError> {
        let template = Template::parse(prompt_template)
            .map_err(|e| stage_failed(AgentError::Render(e)))?;
        self.handle(&template, &QueryRequest::new(system_prompt, user_query))
            .await
    }

    /// Answer `request` under the agent's default call budget.
    pub async fn handle(
        &self,
        template: &Template,
        request: &QueryRequest,
    ) -> Result<Vec<u8>, AgentError> {
        self.handle_with_budget(template, request, &self.call_budget)
            .await
    }

    /// Answer `request`, bounding every provider call by `budget`.
    ///
    /// If `budget` is cancelled before the completion call, nothing is sent.
    pub async fn handle_with_budget(
        &self,
        template: &Template,
        request: &QueryRequest,
        budget: &CallBudget,
    ) -> Result<Vec<u8>, AgentError> {
        let messages = self.prepare(template, request, budget).await?;

        budget
            .check()
            .map_err(|e| stage_failed(AgentError::Provider(e)))?;

        debug!(
            model = self.completion.model_name(),
            messages = messages.len(),
            "Forwarding messages to completion provider"
        );
        budget
            .run(self.completion.complete(&messages))
            .await
            .map_err(|e| stage_failed(AgentError::Provider(e)))
    }

    /// Run retrieval, rendering and parsing, returning the messages that
    /// would be sent to the completion provider.
    pub async fn prepare(
        &self,
        template: &Template,
        request: &QueryRequest,
        budget: &CallBudget,
    ) -> Result<Vec<Message>, AgentError> {
        let rag_context = self
            .retrieve(&request.user_query, budget)
            .await
            .map_err(stage_failed)?;

        let mut ctx = PromptContext::new(
            request.system_prompt.as_str(),
            escape_tags(&request.user_query),
        )
        .with_chat_history(format_messages(&request.history))
        .with_rag_context(escape_tags(&rag_context));
        if let Some(max_tokens) = request.max_tokens.or(self.max_tokens) {
            ctx = ctx.with_max_tokens(max_tokens);
        }

        let rendered = template
            .render_with(&ctx, &self.token_budget)
            .map_err(|e| stage_failed(AgentError::Render(e)))?;

        parse_messages(&rendered).map_err(|e| stage_failed(AgentError::Parse(e)))
    }

    async fn retrieve(&self, query: &str, budget: &CallBudget) -> Result<String, AgentError> {
        let Some(retriever) = &self.retriever else {
            return Ok(String::new());
        };
        let Some(corpus) = self.corpus.snapshot() else {
            debug!("No corpus configured, skipping retrieval");
            return Ok(String::new());
        };

        let hits = retriever
            .search_top_k(query, &corpus, self.top_k, budget)
            .await
            .map_err(AgentError::Retrieval)?;

        Ok(hits
            .iter()
            .map(|hit| hit.embedding.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR))
    }
}

fn stage_failed(err: AgentError) -> AgentError {
    warn!(stage = err.stage(), error = %err, "Query failed");
    err
}
