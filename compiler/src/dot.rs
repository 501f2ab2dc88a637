// dot.rs — Graphviz DOT output for shader node graphs
//
// Renders a `Graph` in DOT format for `dot` and other Graphviz layout
// engines. External nodes are ellipses, library nodes boxes, and every sink
// edge points at one shared `_` node.
//
// Preconditions: `graph` was built by `build_graph`.
// Postconditions: returns a DOT string; node order follows insertion order.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::graph::{EdgeTarget, Graph, NodeInstance, SINK_MARKER};

const SINK_DOT_ID: &str = "\"sink:_\"";

/// Emit the node graph as a Graphviz DOT string.
pub fn emit_dot(graph: &Graph) -> String {
    let mut buf = String::new();
    let _ = writeln!(buf, "digraph shader {{");
    let _ = writeln!(buf, "    rankdir=LR;");
    let _ = writeln!(buf, "    node [fontname=\"Helvetica\", fontsize=10];");
    let _ = writeln!(buf, "    edge [fontname=\"Helvetica\", fontsize=9];");
    let _ = writeln!(buf);

    for node in graph.nodes() {
        let _ = writeln!(buf, "    {} [{}];", dot_node_id(&node.id), node_attrs(node));
    }

    let has_sink = graph.edges().any(|(_, e)| e.to == EdgeTarget::Sink);
    if has_sink {
        let _ = writeln!(
            buf,
            "    {} [label=\"{}\", shape=point, width=0.15];",
            SINK_DOT_ID, SINK_MARKER
        );
    }

    if graph.edge_count() > 0 {
        let _ = writeln!(buf);
    }
    for (from, edge) in graph.edges() {
        let to = match &edge.to {
            EdgeTarget::Node(id) => dot_node_id(id),
            EdgeTarget::Sink => SINK_DOT_ID.to_string(),
        };
        let output = match (&from.external, &edge.output) {
            (Some(binding), _) => binding.name.as_str(),
            (None, Some(expr)) => expr.as_str(),
            (None, None) => "",
        };
        let label = match &edge.to {
            EdgeTarget::Node(_) if output.is_empty() => edge.input.clone(),
            EdgeTarget::Node(_) => format!("{} → {}", output, edge.input),
            EdgeTarget::Sink => output.to_string(),
        };
        let _ = writeln!(
            buf,
            "    {} -> {} [label=\"{}\"];",
            dot_node_id(&from.id),
            to,
            escape(&label)
        );
    }

    let _ = writeln!(buf, "}}");
    buf
}

/// Quoted DOT id. The `node:` prefix keeps user ids apart from the sink node.
fn dot_node_id(id: &str) -> String {
    format!("\"node:{}\"", escape(id))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn node_attrs(node: &NodeInstance) -> String {
    match &node.external {
        Some(binding) if node.is_external() => format!(
            "label=\"{}: {} {} {}\", shape=ellipse",
            escape(&node.id),
            escape(&binding.input_type),
            escape(&binding.data_type),
            escape(&binding.name)
        ),
        _ => format!(
            "label=\"{}: {}\", shape=box",
            escape(&node.id),
            escape(&node.type_tag)
        ),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
