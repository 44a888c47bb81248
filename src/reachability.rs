//! # Reachability
//!
//! Decides which commits take part in a disassembly.
//!
//! The user names roots ([`RootSelector`]); [`resolve_roots`] turns them into
//! nodes and [`discover`] closes over them. Ancestors are always included,
//! since a commit cannot be written back without every parent. With
//! `include_descendants` the walk also follows child edges from every node it
//! reaches, which usually pulls in far more history than the roots alone.
//!
//! The walk uses an explicit stack so that deep histories cannot exhaust the
//! call stack.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::graph::{CommitGraph, NodeId};

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

/// Shortest commit id prefix accepted as a root name.
const MIN_PREFIX_LEN: usize = 4;

/// One source of roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootSelector {
    /// A ref name (full or short) or a commit id (full or unique prefix).
    Name(String),
    /// Every ref under `refs/heads/`.
    AllHeads,
    /// Every ref under `refs/tags/` that points at a commit.
    AllTags,
    /// Every commit in the object store, referenced or not.
    AllCommits,
}

/// Resolve selectors to root nodes, in selector order, without duplicates.
pub fn resolve_roots(graph: &CommitGraph, selectors: &[RootSelector]) -> Result<Vec<NodeId>> {
    let mut roots = Vec::new();
    let mut seen = BTreeSet::new();
    let mut push = |id: NodeId| {
        if seen.insert(id) {
            roots.push(id);
        }
    };

    for selector in selectors {
        match selector {
            RootSelector::Name(name) => push(resolve_name(graph, name)?),
            RootSelector::AllHeads => graph
                .refs()
                .filter(|(name, _)| name.starts_with(HEADS_PREFIX))
                .for_each(|(_, id)| push(id)),
            RootSelector::AllTags => graph
                .refs()
                .filter(|(name, _)| name.starts_with(TAGS_PREFIX))
                .for_each(|(_, id)| push(id)),
            RootSelector::AllCommits => graph.ids().for_each(&mut push),
        }
    }

    Ok(roots)
}

fn resolve_name(graph: &CommitGraph, name: &str) -> Result<NodeId> {
    let candidates = [
        name.to_string(),
        format!("refs/{}", name),
        format!("{}{}", HEADS_PREFIX, name),
        format!("{}{}", TAGS_PREFIX, name),
    ];
    if let Some(id) = candidates.iter().find_map(|c| graph.lookup_ref(c).ok()) {
        return Ok(id);
    }
    if let Some(id) = graph.get(name) {
        return Ok(id);
    }

    if name.len() >= MIN_PREFIX_LEN && name.bytes().all(|b| b.is_ascii_hexdigit()) {
        let mut matches = graph.ids().filter(|id| graph.node(*id).key.starts_with(name));
        if let (Some(id), None) = (matches.next(), matches.next()) {
            return Ok(id);
        }
    }

    Err(Error::UnknownRootReference {
        name: name.to_string(),
    })
}

/// Close `roots` over parent edges, and over child edges when
/// `include_descendants` is set.
///
/// Every node appears once however often it is reached, and the result does
/// not depend on the order or repetition of `roots`.
pub fn discover(
    graph: &CommitGraph,
    roots: &[NodeId],
    include_descendants: bool,
) -> BTreeSet<NodeId> {
    let mut found = BTreeSet::new();
    let mut stack: Vec<NodeId> = roots.to_vec();

    while let Some(id) = stack.pop() {
        if !found.insert(id) {
            continue;
        }
        let node = graph.node(id);
        stack.extend(node.parents().iter().filter(|p| !found.contains(*p)));
        if include_descendants {
            stack.extend(node.children().iter().filter(|c| !found.contains(*c)));
        }
    }

    found
}
