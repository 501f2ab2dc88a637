// template.rs — Body compiler capability and the built-in template compiler
//
// Node bodies are opaque templates. The core only sees the `BodyCompiler`
// trait: compile a template once per node, then render it with that node's
// merged defines. `TemplateCompiler` is the conforming implementation shipped
// with sgc (`{{ NAME }}` interpolation and `{{#if NAME}}` conditionals).
//
// Preconditions: template text is valid UTF-8.
// Postconditions: a rendered body contains no template tags.
// Failure modes: malformed tags → `TemplateError::Syntax`; interpolating a
//   define that is not set → `TemplateError::UndefinedDefine`.
// Side effects: none.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::ast::{Segment, Template};

/// Define name → value. Ordered so that rendering and fingerprints are
/// deterministic.
pub type Defines = BTreeMap<String, Value>;

/// A compiled body: renders text from a set of defines.
pub type BodyFn<'a> = Box<dyn Fn(&Defines) -> Result<String, TemplateError> + 'a>;

/// Turns a node type's body template into a render function.
///
/// Implementations must be usable through `&self`; builds never mutate the
/// compiler.
pub trait BodyCompiler {
    fn compile<'a>(&'a self, type_tag: &str, template: &'a str)
        -> Result<BodyFn<'a>, TemplateError>;
}

// ── Errors ───────────────────────────────────────────────────────────────

/// One syntax problem in a template, with its byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateError {
    Syntax(Vec<SyntaxError>),
    UndefinedDefine { name: String },
    /// Raised by third-party `BodyCompiler` implementations.
    Other(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::Syntax(errors) => {
                write!(f, "template syntax error")?;
                for (i, e) in errors.iter().enumerate() {
                    let sep = if i == 0 { ": " } else { "; " };
                    write!(f, "{}{} (at {}..{})", sep, e.message, e.start, e.end)?;
                }
                Ok(())
            }
            TemplateError::UndefinedDefine { name } => {
                write!(f, "template uses undefined define '{}'", name)
            }
            TemplateError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TemplateError {}

// ── Built-in compiler ────────────────────────────────────────────────────

/// The default body compiler. Stateless; templates are parsed on every
/// `compile` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateCompiler;

impl BodyCompiler for TemplateCompiler {
    fn compile<'a>(
        &'a self,
        type_tag: &str,
        template: &'a str,
    ) -> Result<BodyFn<'a>, TemplateError> {
        let parsed = parse_template(template)?;
        tracing::trace!(
            type_tag,
            segments = parsed.segments.len(),
            "compiled body template"
        );
        Ok(Box::new(move |defines| render(&parsed, defines)))
    }
}

/// Parse template text, folding every lex/parse error into one
/// `TemplateError::Syntax`.
pub fn parse_template(source: &str) -> Result<Template, TemplateError> {
    let result = crate::parser::parse(source);
    if !result.errors.is_empty() {
        let errors = result
            .errors
            .iter()
            .map(|e| SyntaxError {
                message: e.to_string(),
                start: e.span().start,
                end: e.span().end,
            })
            .collect();
        return Err(TemplateError::Syntax(errors));
    }
    result.template.ok_or_else(|| {
        TemplateError::Syntax(vec![SyntaxError {
            message: "template could not be parsed".to_string(),
            start: 0,
            end: source.len(),
        }])
    })
}

/// Render a parsed template with the given defines.
pub fn render(template: &Template, defines: &Defines) -> Result<String, TemplateError> {
    let mut out = String::new();
    render_segments(&template.segments, defines, &mut out)?;
    Ok(out)
}

fn render_segments(
    segments: &[Segment],
    defines: &Defines,
    out: &mut String,
) -> Result<(), TemplateError> {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Interp { name, .. } => {
                let value = defines
                    .get(name)
                    .ok_or_else(|| TemplateError::UndefinedDefine { name: name.clone() })?;
                push_value(value, out);
            }
            Segment::If {
                name,
                then_branch,
                else_branch,
                ..
            } => {
                let branch = if is_truthy(defines.get(name)) {
                    then_branch
                } else {
                    else_branch
                };
                render_segments(branch, defines, out)?;
            }
        }
    }
    Ok(())
}

fn push_value(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}

/// Absent, `null`, `false`, zero and `""` are false; everything else is true.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}
