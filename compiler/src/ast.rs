// AST node types for node body templates.
//
// A template is a flat sequence of segments; conditionals nest their branches.
// Tag segments carry a `SimpleSpan` for error reporting at render time.
//
// Preconditions: produced by the parser from a valid token stream.
// Postconditions: each tag's span covers the source range of the construct.
// Failure modes: none (data-only module).
// Side effects: none.

use std::collections::BTreeSet;

use chumsky::span::SimpleSpan;

/// Byte-offset span (alias for chumsky's `SimpleSpan`).
pub type Span = SimpleSpan;

/// A parsed body template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Verbatim text.
    Text(String),
    /// `{{ NAME }}`
    Interp { name: String, span: Span },
    /// `{{#if NAME}} then {{else}} otherwise {{/if}}`; `else_branch` is empty
    /// when there is no `{{else}}`.
    If {
        name: String,
        then_branch: Vec<Segment>,
        else_branch: Vec<Segment>,
        span: Span,
    },
}

impl Template {
    /// Every define name the template mentions, in either branch.
    pub fn referenced_defines(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        collect_names(&self.segments, &mut names);
        names
    }
}

fn collect_names<'a>(segments: &'a [Segment], names: &mut BTreeSet<&'a str>) {
    for segment in segments {
        match segment {
            Segment::Text(_) => {}
            Segment::Interp { name, .. } => {
                names.insert(name);
            }
            Segment::If {
                name,
                then_branch,
                else_branch,
                ..
            } => {
                names.insert(name);
                collect_names(then_branch, names);
                collect_names(else_branch, names);
            }
        }
    }
}
