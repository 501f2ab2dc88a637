// pipeline.rs — Pass orchestration and build provenance
//
// Runs the passes of one shader build in order (build graph → verify edges →
// sort → codegen) and collects their warnings. Each build starts from the
// caller's data and keeps nothing afterwards.
//
// Preconditions: the library is fully loaded.
// Postconditions: on success, `CompiledShader` holds the program text, the
//                 node order used, and all warnings.
// Failure modes: the first `BuildError` from any pass aborts the build.
// Side effects: emits `tracing` events per pass.

use std::fmt;
use std::time::{Duration, Instant};

use crate::codegen::{assemble, CodegenOptions};
use crate::diag::{BuildError, Diagnostic};
use crate::graph::{build_graph, verify_edges, NodeInstance};
use crate::library::NodeLibrary;
use crate::schedule::{sort, verify_order};
use crate::template::BodyCompiler;

// ── Passes ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    BuildGraph,
    VerifyEdges,
    Sort,
    Codegen,
}

impl Pass {
    pub fn name(self) -> &'static str {
        match self {
            Pass::BuildGraph => "build_graph",
            Pass::VerifyEdges => "verify_edges",
            Pass::Sort => "sort",
            Pass::Codegen => "codegen",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn finish_pass(pass: Pass, elapsed: Duration) {
    tracing::debug!(
        pass = pass.name(),
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "pass complete"
    );
}

// ── Build ──────────────────────────────────────────────────────────────────

/// Output of a successful build.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub source: String,
    /// Node ids in the order their blocks were emitted.
    pub order: Vec<String>,
    /// Warnings; a build with warnings still succeeds.
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile a node graph into a shader program.
pub fn build_shader(
    library: &NodeLibrary,
    instances: Vec<NodeInstance>,
    compiler: &dyn BodyCompiler,
    options: &CodegenOptions,
) -> Result<CompiledShader, BuildError> {
    let _span = tracing::debug_span!("build_shader", nodes = instances.len()).entered();

    let t = Instant::now();
    let graph = build_graph(instances)?;
    finish_pass(Pass::BuildGraph, t.elapsed());
    tracing::debug!(
        nodes = graph.len(),
        edges = graph.edge_count(),
        "graph built"
    );

    let t = Instant::now();
    verify_edges(&graph, library)?;
    finish_pass(Pass::VerifyEdges, t.elapsed());

    let t = Instant::now();
    let order = sort(&graph)?;
    finish_pass(Pass::Sort, t.elapsed());
    let order_ids: Vec<String> = order.iter().map(|n| n.id.clone()).collect();
    if cfg!(debug_assertions) {
        let ids: Vec<&str> = order_ids.iter().map(String::as_str).collect();
        let cert = verify_order(&graph, &ids);
        debug_assert!(cert.all_pass(), "sort postconditions: {}", cert);
    }

    let t = Instant::now();
    let generated = assemble(library, &order, compiler, options)?;
    finish_pass(Pass::Codegen, t.elapsed());
    for diag in &generated.diagnostics {
        tracing::debug!(code = ?diag.code, node = ?diag.node, "{}", diag.message);
    }

    Ok(CompiledShader {
        source: generated.source,
        order: order_ids,
        diagnostics: generated.diagnostics,
    })
}

// ── Provenance ─────────────────────────────────────────────────────────────

/// Provenance metadata for reproducible builds and cache keys.
///
/// `graph_hash`: SHA-256 of the raw graph file text.
/// `library_fingerprint`: SHA-256 of `NodeLibrary::canonical_json()`.
/// `compiler_version`: crate version from `Cargo.toml`.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub graph_hash: [u8; 32],
    pub library_fingerprint: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    pub fn graph_hash_hex(&self) -> String {
        bytes_to_hex(&self.graph_hash)
    }

    pub fn library_fingerprint_hex(&self) -> String {
        bytes_to_hex(&self.library_fingerprint)
    }

    /// Pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> String {
        let value = serde_json::json!({
            "graph_hash": self.graph_hash_hex(),
            "library_fingerprint": self.library_fingerprint_hex(),
            "compiler_version": self.compiler_version,
        });
        let mut text = serde_json::to_string_pretty(&value).unwrap_or_default();
        text.push('\n');
        text
    }
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(64);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Compute provenance from the graph file text and the loaded library.
pub fn compute_provenance(graph_source: &str, library: &NodeLibrary) -> Provenance {
    Provenance {
        graph_hash: sha256(graph_source.as_bytes()),
        library_fingerprint: sha256(library.canonical_json().as_bytes()),
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
