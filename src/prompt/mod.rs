//! Prompt assembly
//!
//! - [`prompt::template`](crate::prompt::template) - Template parsing and rendering
//! - [`prompt::helpers`](crate::prompt::helpers) - `limitTokens` / `multiply` transforms
//! - [`prompt::messages`](crate::prompt::messages) - Tagged-text to message parsing
//!
//! The rendered template is the wire format between the two halves: whatever
//! a template emits must use the `[role]...[/role]` tags that
//! [`parse_messages`] consumes. Text outside a tag span is dropped by the
//! parser, so a template that forgets its tags produces no messages.

pub mod helpers;
pub mod messages;
pub mod template;

pub use helpers::{limit_tokens, multiply, TokenBudget};
pub use messages::{escape_tags, format_messages, parse_messages, validate_tags};
pub use template::{render, Template};

/// Retrieval prompt with chat history and no token budgeting.
pub const DEFAULT_RAG_TEMPLATE: &str = "[system]{{.SystemPrompt}}[/system]
{{.ChatHistory}}
[user]Context: {{.RAGContext}}

User Query: {{.UserQuery}}[/user]";

/// Retrieval prompt that gives half of `.MaxTokens` to the retrieved context
/// and a quarter to the query.
pub const BUDGETED_RAG_TEMPLATE: &str = "[system]{{.SystemPrompt}}[/system]
{{.ChatHistory}}
[user]Context: {{limitTokens .RAGContext (multiply .MaxTokens 0.5)}}

User Query: {{limitTokens .UserQuery (multiply .MaxTokens 0.25)}}[/user]";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Message, PromptContext};

    #[test]
    fn test_default_template_parses_into_messages() {
        let ctx = PromptContext::new("Answer briefly.", "capital of France")
            .with_rag_context("Paris is the capital of France.");
        let rendered = render(DEFAULT_RAG_TEMPLATE, &ctx).unwrap();
        let messages = parse_messages(&rendered).unwrap();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::system("Answer briefly."));
        assert_eq!(
            messages[1].content,
            "Context: Paris is the capital of France.\n\nUser Query: capital of France"
        );
    }

    #[test]
    fn test_history_becomes_separate_turns() {
        let history = format_messages(&[
            Message::user("Hi"),
            Message::assistant("Hello! How can I help?"),
        ]);
        let ctx = PromptContext::new("S", "Q").with_chat_history(history);
        let messages = parse_messages(&render(DEFAULT_RAG_TEMPLATE, &ctx).unwrap()).unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1], Message::user("Hi"));
        assert_eq!(messages[2], Message::assistant("Hello! How can I help?"));
    }

    #[test]
    fn test_budgeted_template_truncates_context() {
        let ctx = PromptContext::new("S", "short")
            .with_rag_context("a".repeat(100))
            .with_max_tokens(10.0);
        let messages = parse_messages(&render(BUDGETED_RAG_TEMPLATE, &ctx).unwrap()).unwrap();

        let expected = format!("Context: {}...\n\nUser Query: short", "a".repeat(20));
        assert_eq!(messages[1].content, expected);
    }
}
