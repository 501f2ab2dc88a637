// schedule.rs — Topological ordering of node instances
//
// Orders the graph so every producer precedes its consumers: depth-first
// traversal from each unvisited node in insertion order, nodes appended in
// postorder, result reversed. Sink edges are not followed.
//
// Preconditions: `graph` was built by `build_graph` (unique ids).
// Postconditions: the returned order contains every node exactly once, and
//                 for every edge u → v (v not the sink) u precedes v.
// Failure modes: a cycle through real edges → `BuildError::CyclicGraph`;
//                an edge to a missing node → `BuildError::UnknownTargetNode`.
// Side effects: none.

use std::collections::HashSet;
use std::fmt;

use crate::diag::BuildError;
use crate::graph::{Graph, NodeInstance};

// ── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Sort the graph's nodes producers-first.
///
/// Ties are broken by discovery order, which is fixed by the graph's
/// insertion order, so equal inputs always give the same order.
pub fn sort(graph: &Graph) -> Result<Vec<&NodeInstance>, BuildError> {
    let nodes = graph.nodes();
    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut postorder: Vec<usize> = Vec::with_capacity(nodes.len());
    // DFS stack of (node index, next edge to follow). Also the current path.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..nodes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        stack.push((root, 0));

        while let Some(&mut (current, ref mut next_edge)) = stack.last_mut() {
            let edges = &nodes[current].outputs_to;
            let Some(edge) = edges.get(*next_edge) else {
                stack.pop();
                marks[current] = Mark::Done;
                postorder.push(current);
                continue;
            };
            *next_edge += 1;

            let Some(target_id) = edge.target() else {
                continue;
            };
            let target = graph
                .position(target_id)
                .ok_or_else(|| BuildError::UnknownTargetNode {
                    node: nodes[current].id.clone(),
                    target: target_id.to_string(),
                })?;
            match marks[target] {
                Mark::Unvisited => {
                    marks[target] = Mark::InProgress;
                    stack.push((target, 0));
                }
                Mark::InProgress => {
                    let start = stack
                        .iter()
                        .position(|&(n, _)| n == target)
                        .unwrap_or(0);
                    let cycle = stack[start..]
                        .iter()
                        .map(|&(n, _)| nodes[n].id.clone())
                        .collect();
                    return Err(BuildError::CyclicGraph { cycle });
                }
                Mark::Done => {}
            }
        }
    }

    postorder.reverse();
    Ok(postorder.into_iter().map(|i| &nodes[i]).collect())
}

// ── Verification ────────────────────────────────────────────────────────────

/// Machine-checkable postconditions of `sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleCert {
    /// S1: every graph node appears exactly once.
    pub s1_complete: bool,
    /// S2: for every real edge u → v, u appears before v.
    pub s2_ordered: bool,
}

impl ScheduleCert {
    pub fn all_pass(&self) -> bool {
        self.s1_complete && self.s2_ordered
    }

    pub fn obligations(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("S1_complete", self.s1_complete),
            ("S2_ordered", self.s2_ordered),
        ]
    }
}

impl fmt::Display for ScheduleCert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed: Vec<&str> = self
            .obligations()
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(name, _)| name)
            .collect();
        if failed.is_empty() {
            write!(f, "all obligations hold")
        } else {
            write!(f, "failed: {}", failed.join(", "))
        }
    }
}

/// Check an order (by node id) against the graph.
pub fn verify_order(graph: &Graph, order: &[&str]) -> ScheduleCert {
    ScheduleCert {
        s1_complete: verify_s1_complete(graph, order),
        s2_ordered: verify_s2_ordered(graph, order),
    }
}

/// S1: (a) same length, (b) no duplicates, (c) every id belongs to the graph.
fn verify_s1_complete(graph: &Graph, order: &[&str]) -> bool {
    if order.len() != graph.len() {
        return false;
    }
    let mut seen = HashSet::with_capacity(order.len());
    order.iter().all(|id| graph.contains(id) && seen.insert(*id))
}

fn verify_s2_ordered(graph: &Graph, order: &[&str]) -> bool {
    let rank: std::collections::HashMap<&str, usize> =
        order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    graph.edges().all(|(from, edge)| match edge.target() {
        None => true,
        Some(to) => match (rank.get(from.id.as_str()), rank.get(to)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
