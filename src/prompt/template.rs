//! Prompt template engine.
//!
//! Templates use a small Go-template-style action language:
//!
//! ```text
//! [system]{{.SystemPrompt}}[/system]
//! [user]{{limitTokens .RAGContext (multiply .MaxTokens 0.5)}}
//! {{- /* the query gets a quarter of the budget */ -}}
//! {{limitTokens .UserQuery (multiply .MaxTokens 0.25)}}[/user]
//! ```
//!
//! Supported inside `{{ }}`: field references (`.SystemPrompt`,
//! `.UserQuery`, `.ChatHistory`, `.RAGContext`, `.MaxTokens`), calls to
//! `limitTokens` and `multiply`, parenthesized sub-expressions, number and
//! string literals, comments and `{{-` / `-}}` whitespace trimming.
//!
//! Malformed source fails at [`Template::parse`] with
//! [`TemplateError::Syntax`]. Fields missing from the context and bad
//! function arguments fail at render time.

use std::fmt;

use crate::error::TemplateError;
use crate::prompt::helpers::{multiply, TokenBudget};
use crate::types::PromptContext;

type Result<T> = std::result::Result<T, TemplateError>;

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const COMMENT_OPEN: &str = "/*";
const COMMENT_CLOSE: &str = "*/";

fn is_trim_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Functions callable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    LimitTokens,
    Multiply,
}

impl Func {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "limitTokens" => Some(Func::LimitTokens),
            "multiply" => Some(Func::Multiply),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Func::LimitTokens => "limitTokens",
            Func::Multiply => "multiply",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Field(String),
    Number(f64),
    Text(String),
    Call { func: Func, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Text(String),
    Action(Expr),
}

/// A value produced while evaluating an action.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Number(f64),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A parsed prompt template, reusable across renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    /// Parse template source.
    pub fn parse(source: &str) -> Result<Self> {
        let mut parser = Parser {
            src: source,
            pos: 0,
            trim_next: false,
            nodes: Vec::new(),
        };
        parser.run()?;
        Ok(Self {
            nodes: parser.nodes,
        })
    }

    /// Render against `ctx` with the default token heuristic.
    pub fn render(&self, ctx: &PromptContext) -> Result<String> {
        self.render_with(ctx, &TokenBudget::default())
    }

    /// Render against `ctx`, truncating with `budget`.
    pub fn render_with(&self, ctx: &PromptContext, budget: &TokenBudget) -> Result<String> {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Action(expr) => {
                    let value = eval(expr, ctx, budget)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Parse and render `template` in one step.
pub fn render(template: &str, ctx: &PromptContext) -> Result<String> {
    Template::parse(template)?.render(ctx)
}

fn lookup_field(name: &str, ctx: &PromptContext) -> Result<Value> {
    let text = match name {
        "SystemPrompt" => &ctx.system_prompt,
        "UserQuery" => &ctx.user_query,
        "ChatHistory" => &ctx.chat_history,
        "RAGContext" => &ctx.rag_context,
        "MaxTokens" => {
            return ctx
                .max_tokens
                .map(Value::Number)
                .ok_or_else(|| TemplateError::MissingField(name.to_string()))
        }
        _ => return Err(TemplateError::MissingField(name.to_string())),
    };
    Ok(Value::Text(text.clone()))
}

fn eval(expr: &Expr, ctx: &PromptContext, budget: &TokenBudget) -> Result<Value> {
    match expr {
        Expr::Field(name) => lookup_field(name, ctx),
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Call { func, args } => {
            if args.len() != 2 {
                return Err(TemplateError::Execution(format!(
                    "wrong number of args for {}: want 2 got {}",
                    func.name(),
                    args.len()
                )));
            }
            let first = eval(&args[0], ctx, budget)?;
            let second = eval(&args[1], ctx, budget)?;

            match (func, first, second) {
                (Func::LimitTokens, Value::Text(text), Value::Number(tokens)) => Ok(Value::Text(
                    budget.limit_tokens(&text, tokens).into_owned(),
                )),
                (Func::Multiply, Value::Number(a), Value::Number(b)) => {
                    Ok(Value::Number(multiply(a, b)))
                }
                (func, first, second) => Err(TemplateError::Execution(format!(
                    "{} cannot be called with ({}, {})",
                    func.name(),
                    first.kind(),
                    second.kind()
                ))),
            }
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

struct Parser<'s> {
    src: &'s str,
    pos: usize,
    trim_next: bool,
    nodes: Vec<Node>,
}

impl<'s> Parser<'s> {
    fn run(&mut self) -> Result<()> {
        let src = self.src;
        while self.pos < src.len() {
            let Some(rel) = src[self.pos..].find(LEFT_DELIM) else {
                self.push_text(&src[self.pos..], false);
                self.pos = src.len();
                break;
            };

            let open = self.pos + rel;
            let mut inner = open + LEFT_DELIM.len();
            let trim_left = has_left_trim(&src[inner..]);
            if trim_left {
                inner += 1;
            }
            self.push_text(&src[self.pos..open], trim_left);
            self.pos = self.parse_action(open, inner)?;
        }
        Ok(())
    }

    /// Append literal text, applying pending trim markers.
    fn push_text(&mut self, text: &'s str, trim_end: bool) {
        let mut text = text;
        if std::mem::take(&mut self.trim_next) {
            text = text.trim_start_matches(is_trim_space);
        }
        if trim_end {
            text = text.trim_end_matches(is_trim_space);
        }
        if !text.is_empty() {
            self.nodes.push(Node::Text(text.to_string()));
        }
    }

    /// Parse the action opened at `open`, returning the offset just past its
    /// closing delimiter.
    fn parse_action(&mut self, open: usize, inner: usize) -> Result<usize> {
        let src = self.src;
        let body = src[inner..].trim_start_matches(is_trim_space);
        let body_start = src.len() - body.len();

        if body.starts_with(COMMENT_OPEN) {
            return self.parse_comment(open, body_start);
        }

        let mut lexer = Lexer {
            src,
            pos: inner,
            open,
        };
        let mut tokens = Vec::new();
        let (trim_right, end) = loop {
            let (token, offset) = lexer.next_token()?;
            match token {
                Token::Close { trim } => break (trim, lexer.pos),
                token => tokens.push((token, offset)),
            }
        };

        let mut cursor = TokenCursor {
            tokens: &tokens,
            index: 0,
            end_offset: end,
        };
        let expr = cursor.parse_command()?;
        if let Some((token, offset)) = cursor.peek() {
            return Err(TemplateError::syntax(
                *offset,
                format!("unexpected {} in action", token.describe()),
            ));
        }

        self.nodes.push(Node::Action(expr));
        self.trim_next = trim_right;
        Ok(end)
    }

    fn parse_comment(&mut self, open: usize, comment_start: usize) -> Result<usize> {
        let src = self.src;
        let search_from = comment_start + COMMENT_OPEN.len();
        let close = src[search_from..]
            .find(COMMENT_CLOSE)
            .map(|rel| search_from + rel + COMMENT_CLOSE.len())
            .ok_or_else(|| TemplateError::syntax(open, "unclosed comment"))?;

        let rest = &src[close..];
        if let Some(after) = rest.strip_prefix(RIGHT_DELIM) {
            return Ok(src.len() - after.len());
        }
        let trimmed = rest.trim_start_matches(is_trim_space);
        if trimmed.len() < rest.len() {
            if let Some(after) = trimmed.strip_prefix("-}}") {
                self.trim_next = true;
                return Ok(src.len() - after.len());
            }
        }
        Err(TemplateError::syntax(
            close,
            "comment ends before closing delimiter",
        ))
    }
}

/// `{{-` only trims when the dash is followed by whitespace; `{{-3}}` is a number.
fn has_left_trim(after_delim: &str) -> bool {
    let mut chars = after_delim.chars();
    chars.next() == Some('-') && chars.next().is_some_and(is_trim_space)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LeftParen,
    RightParen,
    Field(String),
    Ident(String),
    Number(f64),
    Text(String),
    Close { trim: bool },
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
            Token::Field(name) => format!("field .{}", name),
            Token::Ident(name) => format!("identifier {}", name),
            Token::Number(n) => format!("number {}", n),
            Token::Text(s) => format!("string {:?}", s),
            Token::Close { .. } => "closing delimiter".to_string(),
        }
    }
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    /// Offset of the `{{` that opened the action, for error reporting.
    open: usize,
}

impl<'s> Lexer<'s> {
    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next_token(&mut self) -> Result<(Token, usize)> {
        let before = self.pos;
        let rest = self.rest();
        let trimmed = rest.trim_start_matches(is_trim_space);
        self.pos += rest.len() - trimmed.len();
        let skipped_space = self.pos > before;

        let start = self.pos;
        let rest = self.rest();

        if rest.is_empty() {
            return Err(TemplateError::syntax(self.open, "unclosed action"));
        }
        if skipped_space && rest.starts_with("-}}") {
            self.pos += 3;
            return Ok((Token::Close { trim: true }, start));
        }
        if rest.starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            return Ok((Token::Close { trim: false }, start));
        }

        let mut chars = rest.chars();
        let c = chars.next().unwrap_or_default();
        let next = chars.next();

        let token = match c {
            '(' => {
                self.pos += 1;
                Token::LeftParen
            }
            ')' => {
                self.pos += 1;
                Token::RightParen
            }
            '|' => return Err(TemplateError::syntax(start, "pipelines are not supported")),
            '"' => self.lex_quoted(start)?,
            '`' => self.lex_raw(start)?,
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => self.lex_number(start)?,
            '.' if next.is_some_and(is_ident_start) => {
                self.pos += 1;
                Token::Field(self.lex_ident())
            }
            '.' => {
                return Err(TemplateError::syntax(
                    start,
                    "bare '.' is not supported; reference a field such as .UserQuery",
                ))
            }
            '-' | '+' if next.is_some_and(|n| n.is_ascii_digit() || n == '.') => {
                self.lex_number(start)?
            }
            c if c.is_ascii_digit() => self.lex_number(start)?,
            c if is_ident_start(c) => Token::Ident(self.lex_ident()),
            c => {
                return Err(TemplateError::syntax(
                    start,
                    format!("unexpected character {:?} in action", c),
                ))
            }
        };
        Ok((token, start))
    }

    fn lex_ident(&mut self) -> String {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let ident = rest[..len].to_string();
        self.pos += len;
        ident
    }

    fn lex_number(&mut self, start: usize) -> Result<Token> {
        let rest = self.rest();
        let mut len = 0;
        let mut prev = '\0';
        for (i, c) in rest.char_indices() {
            let sign_ok = i == 0 || matches!(prev, 'e' | 'E');
            let accepted = c.is_ascii_digit()
                || c == '.'
                || c == 'e'
                || c == 'E'
                || ((c == '-' || c == '+') && sign_ok);
            if !accepted {
                break;
            }
            len = i + c.len_utf8();
            prev = c;
        }
        let lexeme = &rest[..len];
        let value = lexeme.parse::<f64>().map_err(|_| {
            TemplateError::syntax(start, format!("bad number syntax: {}", lexeme))
        })?;
        self.pos += len;

        match self.peek_char() {
            Some(c) if is_ident_start(c) => Err(TemplateError::syntax(
                start,
                format!("bad number syntax: {}{}", lexeme, c),
            )),
            _ => Ok(Token::Number(value)),
        }
    }

    fn lex_quoted(&mut self, start: usize) -> Result<Token> {
        let src = self.src;
        let mut value = String::new();
        let mut chars = src[start + 1..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos = start + 1 + i + 1;
                    return Ok(Token::Text(value));
                }
                '\\' => {
                    let escaped = match chars.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, 'r')) => '\r',
                        Some((_, '"')) => '"',
                        Some((_, '\\')) => '\\',
                        Some((j, other)) => {
                            return Err(TemplateError::syntax(
                                start + 1 + j,
                                format!("unknown escape sequence \\{}", other),
                            ))
                        }
                        None => break,
                    };
                    value.push(escaped);
                }
                '\n' => break,
                c => value.push(c),
            }
        }
        Err(TemplateError::syntax(start, "unterminated quoted string"))
    }

    fn lex_raw(&mut self, start: usize) -> Result<Token> {
        let src = self.src;
        let body = &src[start + 1..];
        let end = body
            .find('`')
            .ok_or_else(|| TemplateError::syntax(start, "unterminated raw string"))?;
        self.pos = start + 1 + end + 1;
        Ok(Token::Text(body[..end].to_string()))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

struct TokenCursor<'t> {
    tokens: &'t [(Token, usize)],
    index: usize,
    /// Offset of the closing delimiter, reported for missing tokens.
    end_offset: usize,
}

impl TokenCursor<'_> {
    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.index)
    }

    /// command := operand | function operand*
    fn parse_command(&mut self) -> Result<Expr> {
        let Some((token, offset)) = self.peek().cloned() else {
            return Err(TemplateError::syntax(
                self.end_offset,
                "missing value for command",
            ));
        };

        if let Token::Ident(name) = token {
            self.index += 1;
            let func = Func::lookup(&name).ok_or_else(|| {
                TemplateError::syntax(offset, format!("function {:?} not defined", name))
            })?;
            let mut args = Vec::new();
            while let Some((token, _)) = self.peek() {
                if *token == Token::RightParen {
                    break;
                }
                args.push(self.parse_operand()?);
            }
            return Ok(Expr::Call { func, args });
        }

        let operand = self.parse_operand()?;
        match self.peek() {
            Some((Token::RightParen, _)) | None => Ok(operand),
            Some((_, next)) => Err(TemplateError::syntax(
                *next,
                "can't give argument to non-function",
            )),
        }
    }

    fn parse_operand(&mut self) -> Result<Expr> {
        let Some((token, offset)) = self.peek().cloned() else {
            return Err(TemplateError::syntax(self.end_offset, "missing operand"));
        };
        self.index += 1;

        match token {
            Token::Field(name) => Ok(Expr::Field(name)),
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Text(s) => Ok(Expr::Text(s)),
            Token::LeftParen => {
                let inner = self.parse_command()?;
                match self.peek() {
                    Some((Token::RightParen, _)) => {
                        self.index += 1;
                        Ok(inner)
                    }
                    _ => Err(TemplateError::syntax(offset, "unclosed left paren")),
                }
            }
            Token::RightParen => Err(TemplateError::syntax(offset, "unexpected right paren")),
            Token::Ident(name) => Err(TemplateError::syntax(
                offset,
                format!("function {} must be parenthesized when used as an argument", name),
            )),
            Token::Close { .. } => Err(TemplateError::syntax(offset, "unexpected closing delimiter")),
        }
    }
}
