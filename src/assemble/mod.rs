//! # Assembly
//!
//! Turns a disassembled directory tree back into commits and refs:
//!
//! 1. **Read**: parse and validate every commit directory and ref file
//!    ([`reader`]). Nothing touches the repository until this succeeds, so
//!    malformed input aborts with the repository unchanged.
//! 2. **Order**: sort commits parents-first ([`ordering`]). Parent files
//!    that loop are rejected here, still before any write.
//! 3. **Write**: for each commit in order, stage its tree, serialize the
//!    commit with its parents' new ids and write it.
//! 4. **Refs**: point every ref at the new id of its commit.
//!
//! Writes are strictly sequential. A store failure part way through leaves
//! the commits written so far in the repository, unreferenced.

pub mod ordering;
pub mod reader;

use log::{debug, info};

use crate::commit::{self, Commit};
use crate::context::AssembleOptions;
use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::store::ObjectStore;

/// What an assembly produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AssembleReport {
    /// `(directory name, new commit id)` in write order.
    pub commits: Vec<(String, String)>,
    /// `(ref name, new commit id)` in name order.
    pub refs: Vec<(String, String)>,
}

impl AssembleReport {
    /// The new id written for directory `name`.
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.commits
            .iter()
            .find(|(dir, _)| dir == name)
            .map(|(_, id)| id.as_str())
    }
}

/// Assemble the tree at `options.input` into `store`.
pub fn run(store: &dyn ObjectStore, options: &AssembleOptions) -> Result<AssembleReport> {
    let parsed = reader::read_tree(&options.input)?;
    let graph = parsed.to_graph()?;
    info!(
        "Read {} commits and {} refs from {}",
        graph.len(),
        parsed.refs.len(),
        options.input.display()
    );

    let order = ordering::topological_order(&graph)?;
    let mut written: Vec<Option<String>> = vec![None; graph.len()];
    let mut report = AssembleReport::default();

    for id in order {
        let node = graph.node(id);
        let dir = parsed.find(&node.key).ok_or_else(|| Error::UnknownReference {
            name: node.key.clone(),
        })?;

        let tree_path = dir.tree_path();
        let tree = if tree_path.is_dir() {
            store.stage_tree(&tree_path)?
        } else {
            debug!("{} has no tree directory, using an empty tree", node.key);
            let empty = tempfile::tempdir()?;
            store.stage_tree(empty.path())?
        };

        let parents = node
            .parents()
            .iter()
            .map(|parent| {
                written[parent.index()]
                    .clone()
                    .ok_or_else(|| Error::UnresolvedParentName {
                        directory: node.key.clone(),
                        parent: graph.node(*parent).key.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let commit = Commit {
            id: None,
            tree,
            parents,
            author: node.commit.author.clone(),
            committer: node.commit.committer.clone(),
            extra_headers: Vec::new(),
            message: node.commit.message.clone(),
        };
        let new_id = store.write_commit_object(&commit::serialize(&commit))?;
        debug!("Wrote {} as {}", node.key, new_id);

        report.commits.push((node.key.clone(), new_id.clone()));
        written[id.index()] = Some(new_id);
    }

    report.refs = update_refs(store, &graph, &written)?;
    info!(
        "Wrote {} commits and updated {} refs",
        report.commits.len(),
        report.refs.len()
    );
    Ok(report)
}

fn update_refs(
    store: &dyn ObjectStore,
    graph: &CommitGraph,
    written: &[Option<String>],
) -> Result<Vec<(String, String)>> {
    let mut updated = Vec::new();
    for (name, target) in graph.refs() {
        let id = written[target.index()]
            .as_deref()
            .ok_or_else(|| Error::UnresolvedRefTarget {
                ref_name: name.to_string(),
                target: graph.node(target).key.clone(),
            })?;
        store.update_ref(name, id)?;
        updated.push((name.to_string(), id.to_string()));
    }
    Ok(updated)
}
