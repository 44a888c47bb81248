//! Determining write order
//!
//! A commit's bytes embed its parents' ids, and a parent only has an id once
//! it has been written. Commits are therefore written in topological order,
//! parents first.
//!
//! ## Process
//!
//! 1.  **Depth-First Traversal**: Starting from every node in turn, follow
//!     parent edges and emit a node only after all of its parents
//!     (post-order).
//!
//! 2.  **Visited Tracking**: Every node is unvisited, in progress (on the
//!     current path) or done, so it appears exactly once however many
//!     children reach it.
//!
//! 3.  **Cycle Detection**: Reaching a node that is still in progress means
//!     the parent files loop. The directories on that loop are reported
//!     before anything is written.
//!
//! 4.  **Explicit Stack**: The walk keeps its own stack, so a long linear
//!     history does not recurse once per commit.

use crate::error::{Error, Result};
use crate::graph::{CommitGraph, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// All nodes of `graph`, each after all of its parents.
///
/// First parents are visited before later ones, and unrelated histories
/// follow the graph's insertion order, so the result is deterministic.
/// Fails with [`Error::ParentCycle`] when parent edges loop.
pub fn topological_order(graph: &CommitGraph) -> Result<Vec<NodeId>> {
    let mut order = Vec::with_capacity(graph.len());
    let mut marks = vec![Mark::Unvisited; graph.len()];
    // (node, parents already pushed)
    let mut stack: Vec<(NodeId, bool)> = Vec::new();

    for start in graph.ids() {
        if marks[start.index()] != Mark::Unvisited {
            continue;
        }
        stack.push((start, false));

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                marks[id.index()] = Mark::Done;
                order.push(id);
                continue;
            }
            if marks[id.index()] != Mark::Unvisited {
                continue;
            }
            marks[id.index()] = Mark::InProgress;
            stack.push((id, true));
            for &parent in graph.node(id).parents().iter().rev() {
                match marks[parent.index()] {
                    Mark::Unvisited => stack.push((parent, false)),
                    Mark::InProgress => return Err(cycle_error(graph, &stack, parent)),
                    Mark::Done => {}
                }
            }
        }
    }

    Ok(order)
}

/// The in-progress entries of `stack` are the current path, each a parent
/// of the one before. The loop runs from `back_to` to the top and closes
/// on `back_to` again.
fn cycle_error(graph: &CommitGraph, stack: &[(NodeId, bool)], back_to: NodeId) -> Error {
    let path: Vec<NodeId> = stack
        .iter()
        .filter(|(_, expanded)| *expanded)
        .map(|(id, _)| *id)
        .collect();
    let from = path.iter().position(|id| *id == back_to).unwrap_or(0);
    let mut directories: Vec<String> = path[from..]
        .iter()
        .map(|id| graph.node(*id).key.clone())
        .collect();
    directories.push(graph.node(back_to).key.clone());
    Error::ParentCycle { directories }
}
