// Lexer for node body templates.
//
// Tokenizes a body template into raw text runs and `{{ ... }}` tags.
// Uses the `logos` crate for DFA-based lexing.
//
// Preconditions: input is valid UTF-8.
// Postconditions: returns all tokens with byte-offset spans, plus any lex errors.
// Failure modes: unrecognized input produces `LexError`; lexing continues.
// Side effects: none.

use logos::Logos;
use std::fmt;

/// Byte-offset span in template text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A lexer error with location.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

/// Result of lexing: tokens plus any errors (non-fatal).
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<(Token, Span)>,
    pub errors: Vec<LexError>,
}

/// Body template token types.
///
/// Whole tags are matched as single tokens so raw shader text between tags
/// never has to be tokenized. Tag names are carried as values.
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // ── Tags ──
    //
    // `else` is also a valid define name shape; the explicit priority makes
    // `{{else}}` a branch marker rather than an interpolation.
    /// `{{#if NAME}}`
    #[regex(r"\{\{[ \t]*#if[ \t]+[A-Za-z_][A-Za-z0-9_]*[ \t]*\}\}", tag_name, priority = 20)]
    If(String),

    /// `{{else}}`
    #[regex(r"\{\{[ \t]*else[ \t]*\}\}", priority = 20)]
    Else,

    /// `{{/if}}`
    #[regex(r"\{\{[ \t]*/if[ \t]*\}\}", priority = 20)]
    EndIf,

    /// `{{ NAME }}`
    #[regex(r"\{\{[ \t]*[A-Za-z_][A-Za-z0-9_]*[ \t]*\}\}", tag_name)]
    Interp(String),

    /// A `{{` that does not start a well-formed tag, up to the next brace.
    /// Never accepted by the parser.
    ///
    /// Matches every prefix of an unfinished tag, so a tag that fails partway
    /// falls back to this token instead of a shorter one.
    #[regex(r"\{\{[^{}]*")]
    OpenTag,

    // ── Raw text ──
    /// A run of text containing no `{`.
    #[regex(r"[^{]+", |lex| lex.slice().to_owned())]
    Text(String),

    /// A lone `{`, passed through as text (shader scopes use braces).
    #[token("{")]
    Brace,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::If(name) => write!(f, "{{{{#if {name}}}}}"),
            Token::Else => write!(f, "{{{{else}}}}"),
            Token::EndIf => write!(f, "{{{{/if}}}}"),
            Token::Interp(name) => write!(f, "{{{{{name}}}}}"),
            Token::OpenTag => write!(f, "{{{{"),
            Token::Text(_) => write!(f, "<text>"),
            Token::Brace => write!(f, "{{"),
        }
    }
}

// ── Callbacks ──

/// Extract the identifier from `{{ NAME }}` or `{{#if NAME}}`.
fn tag_name(lex: &mut logos::Lexer<'_, Token>) -> String {
    let slice = lex.slice();
    let inner = slice[2..slice.len() - 2].trim();
    inner.strip_prefix("#if").unwrap_or(inner).trim().to_owned()
}

// ── Public API ──

/// Lex a body template into tokens.
///
/// Lexing is non-fatal: errors are collected and the lexer continues past
/// bad input.
pub fn lex(source: &str) -> LexResult {
    let lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, range) in lexer.spanned() {
        let span = Span {
            start: range.start,
            end: range.end,
        };
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(LexError {
                span,
                message: format!("unexpected input: {:?}", &source[span.start..span.end]),
            }),
        }
    }

    LexResult { tokens, errors }
}

// ── Tests ──
