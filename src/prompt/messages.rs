//! Role-tagged message parsing.
//!
//! A rendered prompt marks each message with bracket tags:
//!
//! ```text
//! [system]You are a helpful assistant[/system]
//! [user]Hello, how are you?[/user]
//! ```
//!
//! Only the three roles `system`, `user` and `assistant` are recognized.
//! Angle-bracket forms such as `<user>` are ordinary text. Tag spans may not
//! nest. Text outside any span is dropped.
//!
//! Untrusted text can carry a literal tag as `[\user]`. [`escape_tags`]
//! inserts the backslash and [`parse_messages`] strips one from message
//! content, so the literal survives a format/parse round trip.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::types::{Message, MessageRole};

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(/?)(system|user|assistant)\]").expect("tag pattern is valid")
});

static TAG_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\\*/?(?:system|user|assistant))\]").expect("literal pattern is valid")
});

static ESCAPED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\\(\\*/?(?:system|user|assistant))\]").expect("escaped pattern is valid")
});

/// Neutralize role tags in text that will be spliced into a prompt.
///
/// `[user]` becomes `[\user]` and an already escaped `[\user]` gains another
/// backslash, so the parser never sees structure in the result.
pub fn escape_tags(text: &str) -> Cow<'_, str> {
    TAG_LITERAL.replace_all(text, r"[\${1}]")
}

fn unescape_tags(text: &str) -> Cow<'_, str> {
    ESCAPED_TAG.replace_all(text, "[${1}]")
}

fn open_tag(role: MessageRole) -> String {
    format!("[{}]", role)
}

fn close_tag(role: MessageRole) -> String {
    format!("[/{}]", role)
}

/// Check that every role has as many opening tags as closing tags.
pub fn validate_tags(rendered: &str) -> Result<(), ParseError> {
    for role in MessageRole::ALL {
        let open_count = rendered.matches(&open_tag(role)).count();
        let close_count = rendered.matches(&close_tag(role)).count();
        if open_count != close_count {
            return Err(ParseError::UnbalancedTags {
                role,
                open_count,
                close_count,
            });
        }
    }
    Ok(())
}

/// Parse a rendered prompt into messages in document order.
///
/// Tags are validated before any message is extracted, so an error never
/// comes with partial output. Content is trimmed of surrounding whitespace
/// and escaped tags inside it lose one backslash.
pub fn parse_messages(rendered: &str) -> Result<Vec<Message>, ParseError> {
    validate_tags(rendered)?;

    let mut messages = Vec::new();
    let mut open: Option<(MessageRole, usize)> = None;

    for caps in TAG.captures_iter(rendered) {
        let (Some(whole), Some(slash), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        let role: MessageRole = name
            .as_str()
            .parse()
            .map_err(|_| misplaced(whole.as_str(), whole.start()))?;
        let closing = !slash.as_str().is_empty();

        match (open, closing) {
            (None, false) => open = Some((role, whole.end())),
            (Some((current, start)), true) if current == role => {
                let content = unescape_tags(rendered[start..whole.start()].trim());
                messages.push(Message::new(role, content));
                open = None;
            }
            _ => return Err(misplaced(whole.as_str(), whole.start())),
        }
    }

    if let Some((role, start)) = open {
        let tag = open_tag(role);
        return Err(misplaced(&tag, start - tag.len()));
    }

    Ok(messages)
}

fn misplaced(tag: &str, offset: usize) -> ParseError {
    ParseError::MisplacedTag {
        tag: tag.to_string(),
        offset,
    }
}

/// Render messages back into tagged text, one message per line.
///
/// Tags inside message content are escaped.
pub fn format_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            format!(
                "{}{}{}",
                open_tag(m.role),
                escape_tags(&m.content),
                close_tag(m.role)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
