// graph.rs — Node graph construction and edge verification
//
// Turns the authored list of node instances into a `Graph` addressable by
// node id, and checks every edge against the node-type library. Edges name
// their targets by id; the graph holds no references between nodes.
//
// Preconditions: instances come from a graph file or a caller; the library
//                holds every type tag the graph uses (checked by `verify_edges`).
// Postconditions: `build_graph` guarantees unique ids; `verify_edges`
//                 guarantees every non-sink edge targets a declared input.
// Failure modes: duplicate id, unknown type / target / input, external node
//                without a descriptor → `BuildError`.
// Side effects: reads graph files from disk (`load_graph_file` only).

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::diag::BuildError;
use crate::library::NodeLibrary;
use crate::template::Defines;

/// Reserved type tag for nodes that bridge a shader-stage variable.
pub const EXTERNAL_TYPE: &str = "external";

/// Edge target meaning "no consumer".
pub const SINK_MARKER: &str = "_";

// ── Public types ────────────────────────────────────────────────────────────

/// Storage binding of an `external` node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalBinding {
    /// Storage qualifier keyword, e.g. `uniform`, `attribute`, `varying`.
    pub input_type: String,
    pub data_type: String,
    /// Name of the bridged shader variable.
    pub name: String,
}

/// Where an output edge goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EdgeTarget {
    Node(String),
    /// The `_` marker: the value is discarded.
    Sink,
}

impl From<String> for EdgeTarget {
    fn from(s: String) -> Self {
        if s == SINK_MARKER {
            EdgeTarget::Sink
        } else {
            EdgeTarget::Node(s)
        }
    }
}

impl From<EdgeTarget> for String {
    fn from(t: EdgeTarget) -> Self {
        match t {
            EdgeTarget::Node(id) => id,
            EdgeTarget::Sink => SINK_MARKER.to_string(),
        }
    }
}

impl fmt::Display for EdgeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeTarget::Node(id) => write!(f, "{}", id),
            EdgeTarget::Sink => write!(f, "{}", SINK_MARKER),
        }
    }
}

/// One outgoing connection of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdge {
    pub to: EdgeTarget,
    /// Input name on the target node. Unused for sink edges.
    #[serde(default)]
    pub input: String,
    /// Output (or expression) of the source node that is copied. Ignored for
    /// external nodes, which always copy their bridge variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl OutputEdge {
    /// The target node id, or `None` for sink edges.
    pub fn target(&self) -> Option<&str> {
        match &self.to {
            EdgeTarget::Node(id) => Some(id),
            EdgeTarget::Sink => None,
        }
    }
}

/// One vertex of the authored graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Defines::is_empty")]
    pub defines: Defines,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<ExternalBinding>,
    #[serde(rename = "outputsTo", default)]
    pub outputs_to: Vec<OutputEdge>,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        NodeInstance {
            id: id.into(),
            type_tag: type_tag.into(),
            defines: Defines::new(),
            external: None,
            outputs_to: Vec::new(),
        }
    }

    /// An `external` node bridging `qualifier data_type name`.
    pub fn external(
        id: impl Into<String>,
        qualifier: impl Into<String>,
        data_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let mut node = NodeInstance::new(id, EXTERNAL_TYPE);
        node.external = Some(ExternalBinding {
            input_type: qualifier.into(),
            data_type: data_type.into(),
            name: name.into(),
        });
        node
    }

    /// Add an edge copying `output` into `to.input`.
    pub fn edge(mut self, to: &str, input: &str, output: Option<&str>) -> Self {
        self.outputs_to.push(OutputEdge {
            to: EdgeTarget::from(to.to_string()),
            input: input.to_string(),
            output: output.map(str::to_string),
        });
        self
    }

    pub fn define(mut self, name: &str, value: serde_json::Value) -> Self {
        self.defines.insert(name.to_string(), value);
        self
    }

    pub fn is_external(&self) -> bool {
        self.type_tag == EXTERNAL_TYPE
    }

    /// Ids of nodes this node feeds, skipping sink edges.
    pub fn successors(&self) -> impl Iterator<Item = &str> {
        self.outputs_to.iter().filter_map(OutputEdge::target)
    }
}

/// All node instances, addressable by id. Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<NodeInstance>,
    index: HashMap<String, usize>,
}

impl Graph {
    pub fn nodes(&self) -> &[NodeInstance] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Insertion position of a node.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every edge with its source node, sink edges included.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeInstance, &OutputEdge)> {
        self.nodes
            .iter()
            .flat_map(|n| n.outputs_to.iter().map(move |e| (n, e)))
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.outputs_to.len()).sum()
    }
}

// ── Construction ────────────────────────────────────────────────────────────

/// Index the instances by id. Fails on the first repeated id.
pub fn build_graph(instances: Vec<NodeInstance>) -> Result<Graph, BuildError> {
    let mut index = HashMap::with_capacity(instances.len());
    for (i, node) in instances.iter().enumerate() {
        if index.insert(node.id.clone(), i).is_some() {
            return Err(BuildError::DuplicateIdentifier {
                id: node.id.clone(),
            });
        }
    }
    Ok(Graph {
        nodes: instances,
        index,
    })
}

/// Check every node's type and every edge's target against the library.
///
/// Nodes are checked in insertion order, each node before its edges, so the
/// reported error is the first one in file order.
pub fn verify_edges(graph: &Graph, library: &NodeLibrary) -> Result<(), BuildError> {
    for node in graph.nodes() {
        if node.id == SINK_MARKER {
            return Err(BuildError::ReservedIdentifier {
                id: node.id.clone(),
            });
        }
        if node.is_external() {
            if node.external.is_none() {
                return Err(BuildError::MissingExternal {
                    node: node.id.clone(),
                });
            }
        } else if library.lookup(&node.type_tag).is_none() {
            return Err(BuildError::UnknownNodeType {
                node: node.id.clone(),
                type_tag: node.type_tag.clone(),
            });
        }

        for edge in &node.outputs_to {
            let Some(target_id) = edge.target() else {
                continue;
            };
            let target = graph
                .node(target_id)
                .ok_or_else(|| BuildError::UnknownTargetNode {
                    node: node.id.clone(),
                    target: target_id.to_string(),
                })?;
            let declared = if target.is_external() {
                false
            } else {
                let def = library.lookup(&target.type_tag).ok_or_else(|| {
                    BuildError::UnknownNodeType {
                        node: target.id.clone(),
                        type_tag: target.type_tag.clone(),
                    }
                })?;
                def.input(&edge.input).is_some()
            };
            if !declared {
                return Err(BuildError::UnknownInput {
                    node: node.id.clone(),
                    target: target_id.to_string(),
                    input: edge.input.clone(),
                    type_tag: target.type_tag.clone(),
                });
            }
        }
    }
    Ok(())
}

// ── Graph files ─────────────────────────────────────────────────────────────

/// Errors that can occur while reading a graph file.
#[derive(Debug)]
pub enum GraphFileError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        file: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for GraphFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFileError::IoError { path, source } => {
                write!(f, "{}: {}", path.display(), source)
            }
            GraphFileError::ParseError { file, source } => {
                write!(
                    f,
                    "{}:{}:{}: {}",
                    file.display(),
                    source.line(),
                    source.column(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for GraphFileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GraphFileError::IoError { source, .. } => Some(source),
            GraphFileError::ParseError { source, .. } => Some(source),
        }
    }
}

/// Parse a graph (a JSON array of node instances) from text.
pub fn parse_graph_str(json: &str, origin: &Path) -> Result<Vec<NodeInstance>, GraphFileError> {
    serde_json::from_str(json).map_err(|e| GraphFileError::ParseError {
        file: origin.to_path_buf(),
        source: e,
    })
}

pub fn load_graph_file(path: &Path) -> Result<Vec<NodeInstance>, GraphFileError> {
    let source = std::fs::read_to_string(path).map_err(|e| GraphFileError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_graph_str(&source, path)
}

// ── Tests ───────────────────────────────────────────────────────────────────
