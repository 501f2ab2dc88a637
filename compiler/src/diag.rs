// diag.rs — Unified diagnostics model and build errors
//
// Provides the shared diagnostic types used across all compiler phases, plus
// `BuildError`, the fatal error taxonomy. Warnings travel as `Diagnostic`
// values next to a successful build; a `BuildError` aborts the build.
//
// Preconditions: none (types only).
// Postconditions: none (types only).
// Failure modes: none.
// Side effects: none.

use std::fmt;

use crate::template::TemplateError;

// ── Diagnostic code ──────────────────────────────────────────────────────

/// A stable diagnostic code (e.g., `E0001`, `W0101`).
///
/// Codes are `&'static str` constants defined in the `codes` module.
/// Once assigned, a code must never be reassigned to a different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagCode(pub &'static str);

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable code registry.
///
/// `E00xx` graph structure, `E01xx` ordering, `E02xx` code generation,
/// `E03xx` body templates, `W01xx` code generation warnings.
pub mod codes {
    use super::DiagCode;

    pub const E0001: DiagCode = DiagCode("E0001");
    pub const E0002: DiagCode = DiagCode("E0002");
    pub const E0003: DiagCode = DiagCode("E0003");
    pub const E0004: DiagCode = DiagCode("E0004");
    pub const E0005: DiagCode = DiagCode("E0005");
    pub const E0006: DiagCode = DiagCode("E0006");
    pub const E0100: DiagCode = DiagCode("E0100");
    pub const E0200: DiagCode = DiagCode("E0200");
    pub const E0201: DiagCode = DiagCode("E0201");
    pub const E0300: DiagCode = DiagCode("E0300");

    pub const W0101: DiagCode = DiagCode("W0101");
    pub const W0102: DiagCode = DiagCode("W0102");
}

// ── Severity level ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagLevel {
    Error,
    Warning,
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A compiler diagnostic emitted by any phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: Option<DiagCode>,
    pub level: DiagLevel,
    pub message: String,
    pub hint: Option<String>,
    /// Id of the node instance the diagnostic is about, if any.
    pub node: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with no code, hint, or node.
    pub fn new(level: DiagLevel, message: impl Into<String>) -> Self {
        Self {
            code: None,
            level,
            message: message.into(),
            hint: None,
            node: None,
        }
    }

    pub fn warning(code: DiagCode, message: impl Into<String>) -> Self {
        Self::new(DiagLevel::Warning, message).with_code(code)
    }

    /// Attach a stable diagnostic code.
    pub fn with_code(mut self, code: DiagCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attach the offending node id.
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagLevel::Error => "error",
            DiagLevel::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{}[{}]: {}", level, code, self.message)?;
        } else {
            write!(f, "{}: {}", level, self.message)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

// ── Build errors ─────────────────────────────────────────────────────────

/// Fatal errors. Any of these aborts the current build; no partial output
/// is produced.
#[derive(Debug)]
pub enum BuildError {
    DuplicateIdentifier {
        id: String,
    },
    UnknownNodeType {
        node: String,
        type_tag: String,
    },
    UnknownTargetNode {
        node: String,
        target: String,
    },
    UnknownInput {
        node: String,
        target: String,
        input: String,
        type_tag: String,
    },
    MissingExternal {
        node: String,
    },
    /// A node id equal to the sink marker `_`.
    ReservedIdentifier {
        id: String,
    },
    /// Node ids along the detected cycle, in traversal order.
    CyclicGraph {
        cycle: Vec<String>,
    },
    MissingEdgeOutput {
        node: String,
        target: String,
        input: String,
    },
    StorageNameCollision {
        name: String,
        first: (String, String),
        second: (String, String),
    },
    TemplateCompilation {
        node: String,
        type_tag: String,
        source: TemplateError,
    },
}

impl BuildError {
    pub fn code(&self) -> DiagCode {
        match self {
            BuildError::DuplicateIdentifier { .. } => codes::E0001,
            BuildError::UnknownNodeType { .. } => codes::E0002,
            BuildError::UnknownTargetNode { .. } => codes::E0003,
            BuildError::UnknownInput { .. } => codes::E0004,
            BuildError::MissingExternal { .. } => codes::E0005,
            BuildError::ReservedIdentifier { .. } => codes::E0006,
            BuildError::CyclicGraph { .. } => codes::E0100,
            BuildError::MissingEdgeOutput { .. } => codes::E0200,
            BuildError::StorageNameCollision { .. } => codes::E0201,
            BuildError::TemplateCompilation { .. } => codes::E0300,
        }
    }

    /// The node the error is attributed to, when there is a single one.
    pub fn node(&self) -> Option<&str> {
        match self {
            BuildError::DuplicateIdentifier { id } | BuildError::ReservedIdentifier { id } => {
                Some(id)
            }
            BuildError::UnknownNodeType { node, .. }
            | BuildError::UnknownTargetNode { node, .. }
            | BuildError::UnknownInput { node, .. }
            | BuildError::MissingExternal { node }
            | BuildError::MissingEdgeOutput { node, .. }
            | BuildError::TemplateCompilation { node, .. } => Some(node),
            BuildError::CyclicGraph { cycle } => cycle.first().map(String::as_str),
            BuildError::StorageNameCollision { .. } => None,
        }
    }

    /// Render as an error-level diagnostic, with a hint where one helps.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::new(DiagLevel::Error, self.to_string()).with_code(self.code());
        if let Some(node) = self.node() {
            diag = diag.with_node(node);
        }
        match self {
            BuildError::CyclicGraph { .. } => {
                diag.with_hint("route one of the edges on the cycle to the sink marker `_`")
            }
            BuildError::StorageNameCollision { .. } => {
                diag.with_hint("rename one of the nodes or inputs so the joined names differ")
            }
            BuildError::MissingEdgeOutput { .. } => {
                diag.with_hint("set `output` on the edge to one of the type's declared outputs")
            }
            _ => diag,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::DuplicateIdentifier { id } => {
                write!(f, "duplicate node id '{}'", id)
            }
            BuildError::UnknownNodeType { node, type_tag } => {
                write!(f, "node '{}' has unknown type '{}'", node, type_tag)
            }
            BuildError::UnknownTargetNode { node, target } => {
                write!(f, "node '{}' outputs to unknown node '{}'", node, target)
            }
            BuildError::UnknownInput {
                node,
                target,
                input,
                type_tag,
            } => {
                write!(
                    f,
                    "node '{}' outputs to '{}.{}', but type '{}' declares no input '{}'",
                    node, target, input, type_tag, input
                )
            }
            BuildError::MissingExternal { node } => {
                write!(f, "external node '{}' has no `external` descriptor", node)
            }
            BuildError::ReservedIdentifier { id } => {
                write!(f, "node id '{}' is reserved for the sink marker", id)
            }
            BuildError::CyclicGraph { cycle } => {
                write!(f, "graph contains a cycle: {}", cycle.join(" -> "))?;
                if let Some(first) = cycle.first() {
                    write!(f, " -> {}", first)?;
                }
                Ok(())
            }
            BuildError::MissingEdgeOutput {
                node,
                target,
                input,
            } => {
                write!(
                    f,
                    "edge from node '{}' to '{}.{}' does not name an output, \
                     and the node's type does not have exactly one",
                    node, target, input
                )
            }
            BuildError::StorageNameCollision {
                name,
                first,
                second,
            } => {
                write!(
                    f,
                    "storage name '{}' is shared by '{}.{}' and '{}.{}'",
                    name, first.0, first.1, second.0, second.1
                )
            }
            BuildError::TemplateCompilation {
                node,
                type_tag,
                source,
            } => {
                write!(
                    f,
                    "body of node '{}' (type '{}') failed to compile: {}",
                    node, type_tag, source
                )
            }
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::TemplateCompilation { source, .. } => Some(source),
            _ => None,
        }
    }
}
