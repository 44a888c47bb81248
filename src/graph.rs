//! # Commit Graph
//!
//! An arena of [`CommitNode`]s addressed by [`NodeId`], indexed by a string
//! key. During disassembly the key is the commit's object id; during
//! assembly it is the directory name the commit was read from.
//!
//! Parent edges are authoritative: they come from each commit's parent
//! list. Child edges are derived from them in one pass after all nodes
//! exist and are never edited on their own. Rebuilding the graph means
//! building a new arena.
//!
//! Refs are kept beside the nodes in a name-ordered map. They do not affect
//! the graph's shape.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::commit::Commit;
use crate::error::{Error, Result};

/// Index of a node in a [`CommitGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One commit with its resolved edges.
#[derive(Debug, Clone)]
pub struct CommitNode {
    pub key: String,
    pub commit: Commit,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

impl CommitNode {
    /// Parents in commit order. The first parent is the mainline.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// All commits of one run, plus the refs that point into them.
#[derive(Debug, Default)]
pub struct CommitGraph {
    nodes: Vec<CommitNode>,
    index: HashMap<String, NodeId>,
    refs: BTreeMap<String, NodeId>,
}

impl CommitGraph {
    /// Build a graph keyed by each commit's object id.
    ///
    /// Commits without an id cannot be keyed and are rejected as malformed.
    pub fn from_commits(commits: Vec<Commit>) -> Result<Self> {
        let entries = commits
            .into_iter()
            .map(|commit| match commit.id.clone() {
                Some(id) => Ok((id, commit)),
                None => Err(Error::MalformedCommit {
                    id: String::new(),
                    message: "commit has no object id".to_string(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::build(entries)
    }

    /// Build a graph from `(key, commit)` pairs whose parent lists name
    /// other keys.
    ///
    /// Fails with [`Error::UnresolvedParent`] when a parent key is not among
    /// the entries, which happens for shallow or partial object sets.
    pub fn build(entries: Vec<(String, Commit)>) -> Result<Self> {
        let mut graph = CommitGraph::default();

        for (key, commit) in entries {
            if graph.index.contains_key(&key) {
                debug!("Ignoring duplicate commit {}", key);
                continue;
            }
            let id = NodeId(graph.nodes.len());
            graph.index.insert(key.clone(), id);
            graph.nodes.push(CommitNode {
                key,
                commit,
                parents: Vec::new(),
                children: Vec::new(),
            });
        }

        for position in 0..graph.nodes.len() {
            let parents = graph.nodes[position]
                .commit
                .parents
                .iter()
                .map(|parent| {
                    graph
                        .index
                        .get(parent)
                        .copied()
                        .ok_or_else(|| Error::UnresolvedParent {
                            commit: graph.nodes[position].key.clone(),
                            parent: parent.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            graph.nodes[position].parents = parents;
        }

        graph.derive_children();
        Ok(graph)
    }

    fn derive_children(&mut self) {
        for node in &mut self.nodes {
            node.children.clear();
        }
        for position in 0..self.nodes.len() {
            let child = NodeId(position);
            for parent in self.nodes[position].parents.clone() {
                let children = &mut self.nodes[parent.0].children;
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &CommitNode {
        &self.nodes[id.0]
    }

    /// All node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Look up a node by its key.
    pub fn lookup(&self, key: &str) -> Result<NodeId> {
        self.get(key).ok_or_else(|| Error::UnknownReference {
            name: key.to_string(),
        })
    }

    /// Record that ref `name` points at the node keyed `target`.
    ///
    /// Returns `false`, recording nothing, when no such node exists.
    pub fn insert_ref(&mut self, name: impl Into<String>, target: &str) -> bool {
        match self.get(target) {
            Some(id) => {
                self.refs.insert(name.into(), id);
                true
            }
            None => false,
        }
    }

    /// Look up the node a ref points at.
    pub fn lookup_ref(&self, name: &str) -> Result<NodeId> {
        self.refs
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownReference {
                name: name.to_string(),
            })
    }

    /// Refs in name order.
    pub fn refs(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.refs.iter().map(|(name, id)| (name.as_str(), *id))
    }
}
