// Parser for node body templates.
//
// Parses a token stream (from the lexer) into a `Template`. Uses chumsky
// combinators; conditionals nest through a recursive block rule.
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns a template plus any parse errors (non-fatal).
// Failure modes: unbalanced or malformed tags produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::ast::*;
use crate::lexer::Token;

/// Result of parsing: template plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub template: Option<Template>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse a body template string. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    // Convert lexer output to chumsky stream.
    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let parser = block_parser()
        .then_ignore(end())
        .map(|segments| Template { segments });
    let (template, parse_errors) = parser.parse(stream).into_output_errors();

    // Merge lex errors + parse errors.
    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        template,
        errors: all_errors,
    }
}

// ── Grammar ──
//
//   block       = segment*
//   segment     = TEXT | '{' | interp | conditional
//   conditional = IF block (ELSE block)? ENDIF

fn block_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<Segment>, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    recursive(|block| {
        let text = select! {
            Token::Text(s) => Segment::Text(s),
            Token::Brace => Segment::Text("{".to_string()),
        };

        let interp = select! { Token::Interp(name) => name }
            .map_with(|name, e| Segment::Interp {
                name,
                span: e.span(),
            });

        let conditional = select! { Token::If(name) => name }
            .then(block.clone())
            .then(just(Token::Else).ignore_then(block.clone()).or_not())
            .then_ignore(just(Token::EndIf))
            .map_with(|((name, then_branch), else_branch), e| Segment::If {
                name,
                then_branch,
                else_branch: else_branch.unwrap_or_default(),
                span: e.span(),
            });

        text.or(interp).or(conditional).repeated().collect::<Vec<_>>()
    })
}

// ── Tests ──
