//! Token-budget helpers exposed to templates as `limitTokens` and `multiply`.

use std::borrow::Cow;

/// Characters assumed per token when converting a token budget to a length.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 4.0;

/// Appended to text that `limitTokens` cut short.
pub const DEFAULT_TRUNCATION_MARKER: &str = "...";

/// Heuristic used to turn token budgets into character limits.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenBudget {
    pub chars_per_token: f64,
    pub truncation_marker: String,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            truncation_marker: DEFAULT_TRUNCATION_MARKER.to_string(),
        }
    }
}

impl TokenBudget {
    /// `floor(tokens * chars_per_token)`, clamped at zero.
    pub fn max_chars(&self, tokens: f64) -> usize {
        // Float-to-int casts saturate; NaN and negatives become 0.
        (tokens * self.chars_per_token).floor() as usize
    }

    /// Truncate `text` to the character length `tokens` allows, appending the
    /// truncation marker when anything was cut.
    pub fn limit_tokens<'a>(&self, text: &'a str, tokens: f64) -> Cow<'a, str> {
        let max_chars = self.max_chars(tokens);
        match text.char_indices().nth(max_chars) {
            Some((cut, _)) => {
                let mut truncated = String::with_capacity(cut + self.truncation_marker.len());
                truncated.push_str(&text[..cut]);
                truncated.push_str(&self.truncation_marker);
                Cow::Owned(truncated)
            }
            None => Cow::Borrowed(text),
        }
    }
}

/// Truncate `text` to roughly `tokens` tokens using the default heuristic.
pub fn limit_tokens(text: &str, tokens: f64) -> Cow<'_, str> {
    TokenBudget::default().limit_tokens(text, tokens)
}

/// Scale a token budget by a weight, e.g. `multiply(max_tokens, 0.5)`.
pub fn multiply(a: f64, b: f64) -> f64 {
    a * b
}
