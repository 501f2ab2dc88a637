// codegen.rs — Shader program text generation
//
// Turns a producer-first ordering of node instances into one shader program:
// external declarations, the entry point, one storage declaration per node
// input, then one scoped block per node. Node blocks declare their outputs,
// hold the rendered body with input names rewritten to storage names, and
// end with copies of outputs into consumers' inputs.
//
// Preconditions: `order` comes from `schedule::sort` over a graph that passed
//                `graph::verify_edges` against the same library.
// Postconditions: returns `CodegenResult` with the program text and warnings.
// Failure modes: unknown type, missing edge output, storage name collision,
//                body compilation failure → `BuildError`.
// Side effects: none.

use std::collections::HashSet;
use std::fmt::Write as _;

use regex::{Captures, Regex};

use crate::diag::{codes, BuildError, Diagnostic};
use crate::graph::NodeInstance;
use crate::library::{NodeLibrary, NodeTypeDef};
use crate::naming::{input_var_name, StorageNames};
use crate::template::{BodyCompiler, Defines, TemplateError};

// ── Public types ────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct CodegenResult {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Entry point signature; the opening brace is added.
    pub entry_point: String,
    /// One level of indentation.
    pub indent: String,
    /// Emit `// node <id>, <type>` comments.
    pub node_comments: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        CodegenOptions {
            entry_point: "void main(void)".to_string(),
            indent: "    ".to_string(),
            node_comments: true,
        }
    }
}

// ── Per-node code ───────────────────────────────────────────────────────────

/// Copies of an external node's bridge variable into its consumers' inputs.
pub fn generate_external_code(node: &NodeInstance) -> Result<String, BuildError> {
    let binding = node
        .external
        .as_ref()
        .ok_or_else(|| BuildError::MissingExternal {
            node: node.id.clone(),
        })?;
    let mut out = String::new();
    for edge in &node.outputs_to {
        if let Some(target) = edge.target() {
            let _ = writeln!(
                out,
                "{} = {};",
                input_var_name(target, &edge.input),
                binding.name
            );
        }
    }
    Ok(out)
}

/// Output declarations, rendered body and output copies of a library node.
///
/// Inputs the body never mentions are reported through `diagnostics` as
/// `W0101`; the build continues.
pub fn generate_node_code(
    node: &NodeInstance,
    def: &NodeTypeDef,
    compiler: &dyn BodyCompiler,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String, BuildError> {
    let template_err = |source: TemplateError| BuildError::TemplateCompilation {
        node: node.id.clone(),
        type_tag: node.type_tag.clone(),
        source,
    };

    let mut out = String::new();
    for output in &def.outputs {
        let _ = writeln!(out, "{} {};", output.ty, output.name);
    }

    let mut defines: Defines = def.defines.clone();
    defines.extend(node.defines.iter().map(|(k, v)| (k.clone(), v.clone())));
    let body_fn = compiler
        .compile(&node.type_tag, &def.body)
        .map_err(template_err)?;
    let body = body_fn(&defines).map_err(template_err)?;

    let (body, referenced) = rewrite_inputs(&body, &node.id, def).map_err(template_err)?;
    for input in &def.inputs {
        if !referenced.contains(input.name.as_str()) {
            diagnostics.push(
                Diagnostic::warning(
                    codes::W0101,
                    format!(
                        "input '{}' of node '{}' (type '{}') is never used by its body",
                        input.name, node.id, node.type_tag
                    ),
                )
                .with_node(&node.id),
            );
        }
    }
    let body = body.trim_matches('\n');
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }

    for edge in &node.outputs_to {
        let Some(target) = edge.target() else {
            continue;
        };
        let output = match (&edge.output, def.sole_output()) {
            (Some(expr), _) => expr.as_str(),
            (None, Some(only)) => only.name.as_str(),
            (None, None) => {
                return Err(BuildError::MissingEdgeOutput {
                    node: node.id.clone(),
                    target: target.to_string(),
                    input: edge.input.clone(),
                })
            }
        };
        let _ = writeln!(out, "{} = {};", input_var_name(target, &edge.input), output);
    }
    Ok(out)
}

/// Replace whole-word input names in `body` with their storage names, in a
/// single left-to-right pass. Returns the rewritten text and the inputs
/// that occurred.
fn rewrite_inputs<'d>(
    body: &str,
    node_id: &str,
    def: &'d NodeTypeDef,
) -> Result<(String, HashSet<&'d str>), TemplateError> {
    if def.inputs.is_empty() {
        return Ok((body.to_string(), HashSet::new()));
    }
    let alternation = def
        .inputs
        .iter()
        .map(|p| regex::escape(&p.name))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = Regex::new(&format!(r"\b(?:{})\b", alternation))
        .map_err(|e| TemplateError::Other(format!("input rewrite pattern: {}", e)))?;

    let mut referenced = HashSet::new();
    let rewritten = pattern.replace_all(body, |caps: &Captures| {
        let name = &caps[0];
        if let Some(port) = def.input(name) {
            referenced.insert(port.name.as_str());
        }
        input_var_name(node_id, name)
    });
    Ok((rewritten.into_owned(), referenced))
}

// ── Program assembly ────────────────────────────────────────────────────────

/// Generate the whole program for nodes already in producer-first order.
pub fn assemble(
    library: &NodeLibrary,
    order: &[&NodeInstance],
    compiler: &dyn BodyCompiler,
    options: &CodegenOptions,
) -> Result<CodegenResult, BuildError> {
    let mut ctx = CodegenCtx::new(library, order, compiler, options);
    ctx.emit_all()?;
    Ok(ctx.build_result())
}

struct CodegenCtx<'a> {
    library: &'a NodeLibrary,
    order: &'a [&'a NodeInstance],
    compiler: &'a dyn BodyCompiler,
    options: &'a CodegenOptions,
    names: StorageNames,
    out: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> CodegenCtx<'a> {
    fn new(
        library: &'a NodeLibrary,
        order: &'a [&'a NodeInstance],
        compiler: &'a dyn BodyCompiler,
        options: &'a CodegenOptions,
    ) -> Self {
        CodegenCtx {
            library,
            order,
            compiler,
            options,
            names: StorageNames::new(),
            out: String::with_capacity(4096),
            diagnostics: Vec::new(),
        }
    }

    fn lookup_def(&self, node: &NodeInstance) -> Result<&'a NodeTypeDef, BuildError> {
        self.library
            .lookup(&node.type_tag)
            .ok_or_else(|| BuildError::UnknownNodeType {
                node: node.id.clone(),
                type_tag: node.type_tag.clone(),
            })
    }

    fn build_result(self) -> CodegenResult {
        CodegenResult {
            source: self.out,
            diagnostics: self.diagnostics,
        }
    }

    fn emit_all(&mut self) -> Result<(), BuildError> {
        self.emit_external_decls()?;
        let _ = writeln!(self.out, "{} {{", self.options.entry_point);
        self.emit_input_decls()?;
        self.emit_node_blocks()?;
        let _ = writeln!(self.out, "}}");
        Ok(())
    }

    fn emit_comment(&mut self, node: &NodeInstance, indent: &str) {
        if self.options.node_comments {
            let _ = writeln!(self.out, "{}// node {}, {}", indent, node.id, node.type_tag);
        }
    }

    fn emit_external_decls(&mut self) -> Result<(), BuildError> {
        let order = self.order;
        let mut any = false;
        for node in order.iter().filter(|n| n.is_external()) {
            let binding = node
                .external
                .as_ref()
                .ok_or_else(|| BuildError::MissingExternal {
                    node: node.id.clone(),
                })?;
            let _ = writeln!(
                self.out,
                "{} {} {};",
                binding.input_type, binding.data_type, binding.name
            );
            any = true;
        }
        if any {
            self.out.push('\n');
        }
        Ok(())
    }

    /// One storage variable per declared input of every library node, and
    /// a `W0102` warning for each input no edge writes.
    fn emit_input_decls(&mut self) -> Result<(), BuildError> {
        let order = self.order;
        let written: HashSet<(&str, &str)> = order
            .iter()
            .flat_map(|n| n.outputs_to.iter())
            .filter_map(|e| e.target().map(|t| (t, e.input.as_str())))
            .collect();

        let indent = self.options.indent.clone();
        let mut any = false;
        for &node in order {
            if node.is_external() {
                continue;
            }
            let def = self.lookup_def(node)?;
            if def.inputs.is_empty() {
                continue;
            }
            self.emit_comment(node, &indent);
            for input in &def.inputs {
                let name = self.names.register(&node.id, &input.name)?;
                let _ = writeln!(self.out, "{}{} {};", indent, input.ty, name);
                if !written.contains(&(node.id.as_str(), input.name.as_str())) {
                    self.diagnostics.push(
                        Diagnostic::warning(
                            codes::W0102,
                            format!(
                                "input '{}' of node '{}' is not connected; it is read uninitialized",
                                input.name, node.id
                            ),
                        )
                        .with_node(&node.id),
                    );
                }
            }
            any = true;
        }
        if any {
            self.out.push('\n');
        }
        Ok(())
    }

    fn emit_node_blocks(&mut self) -> Result<(), BuildError> {
        let indent = self.options.indent.clone();
        let inner = indent.repeat(2);
        let order = self.order;
        for &node in order {
            let code = if node.is_external() {
                generate_external_code(node)?
            } else {
                let def = self.lookup_def(node)?;
                generate_node_code(node, def, self.compiler, &mut self.diagnostics)?
            };
            tracing::trace!(node = %node.id, bytes = code.len(), "generated node block");

            self.emit_comment(node, &indent);
            let _ = writeln!(self.out, "{}{{", indent);
            for line in code.lines() {
                if line.trim().is_empty() {
                    self.out.push('\n');
                } else {
                    let _ = writeln!(self.out, "{}{}", inner, line);
                }
            }
            let _ = writeln!(self.out, "{}}}", indent);
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
