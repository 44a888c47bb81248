//! # Disassembly
//!
//! Turns a repository into a directory tree:
//!
//! 1. **Load**: list every commit object and parse it. Reads run on a
//!    bounded rayon pool since each one may cost a `git` process; the graph
//!    is only built once all parses are back.
//! 2. **Discover**: resolve the requested roots and close over ancestors
//!    (and descendants, if asked).
//! 3. **Check**: refuse commits with content the layout cannot express,
//!    unless the caller opted into dropping it.
//! 4. **Name**: assign each included commit its directory name.
//! 5. **Write**: one directory per commit, then one file per ref that
//!    points at an included commit.
//!
//! A failure part way through leaves the output partially written.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::commit::{self, ExtraHeader};
use crate::context::DisassembleOptions;
use crate::error::{Error, Result};
use crate::graph::{CommitGraph, NodeId};
use crate::layout::{self, write_file};
use crate::naming::assign_names;
use crate::reachability::{discover, resolve_roots};
use crate::store::{ObjectKind, ObjectStore};

/// What a disassembly produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DisassembleReport {
    /// Commit directories written.
    pub commits: usize,
    /// Ref files written.
    pub refs: usize,
    /// Ids of commits whose signature (or similar block) was dropped.
    pub stripped: Vec<String>,
    /// Ids of commits with marker headers that were not exported.
    pub dropped_markers: Vec<String>,
}

/// Read and parse every commit in `store` and build the graph, with the
/// refs that point at commits.
pub fn load_graph(store: &dyn ObjectStore, jobs: usize) -> Result<CommitGraph> {
    let ids: Vec<String> = store
        .list_all_objects()?
        .into_iter()
        .filter(|object| object.kind == ObjectKind::Commit)
        .map(|object| object.id)
        .collect();
    info!("Reading {} commits with {} workers", ids.len(), jobs.max(1));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| Error::ThreadPool {
            message: e.to_string(),
        })?;
    let commits = pool.install(|| {
        ids.par_iter()
            .map(|id| {
                let raw = store.read_object(id)?;
                commit::parse(id, &raw)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut graph = CommitGraph::from_commits(commits)?;

    for entry in store.list_refs()? {
        if entry.kind != ObjectKind::Commit {
            debug!(
                "Skipping ref {}: points at a {}, not a commit",
                entry.name, entry.kind
            );
            continue;
        }
        if !graph.insert_ref(&entry.name, &entry.target) {
            debug!(
                "Skipping ref {}: commit {} was not loaded",
                entry.name, entry.target
            );
        }
    }

    Ok(graph)
}

/// Disassemble the history in `store` into `options.output`.
pub fn run(store: &dyn ObjectStore, options: &DisassembleOptions) -> Result<DisassembleReport> {
    prepare_output(&options.output, options.allow_existing_output)?;

    let graph = load_graph(store, options.jobs)?;
    let roots = resolve_roots(&graph, &options.effective_roots())?;
    let included = discover(&graph, &roots, options.include_descendants);
    info!(
        "{} roots selected, {} commits to export",
        roots.len(),
        included.len()
    );

    let mut report = check_exportable(&graph, &included, options.strip_unsupported)?;
    let names = assign_names(&graph, &included)?;

    for &id in &included {
        write_commit(store, &graph, id, &names, &options.output)?;
    }
    report.commits = included.len();
    report.refs = write_refs(&graph, &included, &names, &options.output)?;

    info!(
        "Wrote {} commits and {} refs to {}",
        report.commits,
        report.refs,
        options.output.display()
    );
    Ok(report)
}

fn prepare_output(output: &Path, allow_existing: bool) -> Result<()> {
    if output.exists() {
        let mut entries = fs::read_dir(output).map_err(|e| Error::path(output, e))?;
        if entries.next().is_some() && !allow_existing {
            return Err(Error::OutputNotEmpty {
                path: output.to_path_buf(),
                hint: Some("pass --force to write into it anyway".to_string()),
            });
        }
    }
    fs::create_dir_all(output).map_err(|e| Error::path(output, e))
}

/// Fail on the first commit with an unsupported block unless stripping was
/// requested, or with a commit time the layout cannot write. Markers are
/// always dropped, with a warning.
fn check_exportable(
    graph: &CommitGraph,
    included: &BTreeSet<NodeId>,
    strip_unsupported: bool,
) -> Result<DisassembleReport> {
    let mut report = DisassembleReport::default();

    for &id in included {
        let node = graph.node(id);
        let commit = &node.commit;

        if commit.committer.time != commit.author.time && commit.committer.time.to_text().is_none()
        {
            return Err(Error::MalformedCommit {
                id: node.key.clone(),
                message: format!(
                    "commit time {} is out of range",
                    commit.committer.time.to_raw()
                ),
            });
        }

        if let Some(header) = commit.first_unsupported() {
            if !strip_unsupported {
                return Err(Error::UnsupportedMetadata {
                    id: node.key.clone(),
                    header: header.key().to_string(),
                    hint: Some(
                        "pass --strip-signatures to drop it; the assembled commit will get a new id"
                            .to_string(),
                    ),
                });
            }
            warn!("Dropping {} block of commit {}", header.key(), node.key);
            report.stripped.push(node.key.clone());
        }

        let markers: Vec<&str> = commit
            .extra_headers
            .iter()
            .filter(|h| matches!(h, ExtraHeader::Marker(_)))
            .map(ExtraHeader::key)
            .collect();
        if !markers.is_empty() {
            warn!(
                "Commit {} has headers that are not exported: {}",
                node.key,
                markers.join(", ")
            );
            report.dropped_markers.push(node.key.clone());
        }
    }

    Ok(report)
}

fn name_of<'a>(names: &'a BTreeMap<NodeId, String>, graph: &CommitGraph, id: NodeId) -> Result<&'a str> {
    names
        .get(&id)
        .map(String::as_str)
        .ok_or_else(|| Error::UnknownReference {
            name: graph.node(id).key.clone(),
        })
}

fn write_commit(
    store: &dyn ObjectStore,
    graph: &CommitGraph,
    id: NodeId,
    names: &BTreeMap<NodeId, String>,
    output: &Path,
) -> Result<()> {
    let node = graph.node(id);
    let commit = &node.commit;
    let dir = output.join(name_of(names, graph, id)?);
    debug!("Writing {} to {}", node.key, dir.display());

    fs::create_dir_all(&dir).map_err(|e| Error::path(&dir, e))?;
    store.materialize_tree(&node.key, &dir.join(layout::TREE_DIR))?;

    write_file(&dir.join(layout::MESSAGE_FILE), commit.message_bytes())?;
    for (index, &parent) in node.parents().iter().enumerate() {
        write_file(
            &dir.join(layout::parent_file(index)),
            name_of(names, graph, parent)?,
        )?;
    }

    write_file(&dir.join(layout::AUTHOR_FILE), &commit.author.name)?;
    if commit.committer.name != commit.author.name {
        write_file(&dir.join(layout::COMMITTER_FILE), &commit.committer.name)?;
    }
    if commit.committer.time != commit.author.time {
        let text = commit
            .committer
            .time
            .to_text()
            .ok_or_else(|| Error::MalformedCommit {
                id: node.key.clone(),
                message: format!(
                    "commit time {} is out of range",
                    commit.committer.time.to_raw()
                ),
            })?;
        write_file(&dir.join(layout::COMMIT_TIME_FILE), text)?;
    }

    Ok(())
}

fn write_refs(
    graph: &CommitGraph,
    included: &BTreeSet<NodeId>,
    names: &BTreeMap<NodeId, String>,
    output: &Path,
) -> Result<usize> {
    let mut written = 0;
    for (name, target) in graph.refs() {
        if !included.contains(&target) {
            debug!("Skipping ref {}: its commit is not exported", name);
            continue;
        }
        if !name.starts_with("refs/") {
            debug!("Skipping ref {}: not under refs/", name);
            continue;
        }
        let path = layout::ref_path(output, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::path(parent, e))?;
        }
        write_file(&path, name_of(names, graph, target)?)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reachability::RootSelector;
    use crate::store::memory::MemoryStore;
    use tempfile::TempDir;

    struct Linear {
        store: MemoryStore,
        a: String,
        b: String,
        c: String,
    }

    fn linear_history() -> Linear {
        let store = MemoryStore::new();
        let a = store
            .commit_files(&[("README.md", "a\n")], &[], 1_600_000_000, "Add readme\n")
            .unwrap();
        let b = store
            .commit_files(&[("README.md", "b\n")], &[&a], 1_600_000_100, "Second\n")
            .unwrap();
        let c = store
            .commit_files(&[("README.md", "c\n")], &[&b], 1_600_000_200, "Third\n")
            .unwrap();
        store.update_ref("refs/heads/main", &c).unwrap();
        Linear { store, a, b, c }
    }

    fn dirs(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_linear_history_layout() {
        let history = linear_history();
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let mut options = DisassembleOptions::new(&out);
        options.roots = vec![RootSelector::AllHeads];

        let report = run(&history.store, &options).unwrap();
        assert_eq!(report.commits, 3);
        assert_eq!(report.refs, 1);

        let entries = dirs(&out);
        assert_eq!(entries.len(), 4);
        assert!(entries.contains(&"refs".to_string()));

        let name = |id: &str| {
            entries
                .iter()
                .find(|n| n.contains(&id[..8]))
                .cloned()
                .unwrap()
        };
        let (a, b, c) = (name(&history.a), name(&history.b), name(&history.c));
        assert_eq!(a, format!("2020-09-13_12-26-40+0000--{}--Add.readme", &history.a[..8]));

        assert_eq!(fs::read_to_string(out.join(&b).join("parent0.txt")).unwrap(), a);
        assert!(!out.join(&b).join("parent1.txt").exists());
        assert!(!out.join(&a).join("parent0.txt").exists());
        assert_eq!(fs::read_to_string(out.join("refs/heads/main")).unwrap(), c);
        assert_eq!(
            fs::read_to_string(out.join(&c).join("tree/README.md")).unwrap(),
            "c\n"
        );
        assert_eq!(
            fs::read_to_string(out.join(&c).join("message.txt")).unwrap(),
            "Third\n"
        );
        assert_eq!(
            fs::read_to_string(out.join(&c).join("author.txt")).unwrap(),
            "Test <test@example.com>"
        );
        assert!(!out.join(&c).join("committer.txt").exists());
        assert!(!out.join(&c).join("commit-time.txt").exists());
    }

    #[test]
    fn test_committer_and_time_written_only_when_different() {
        let store = MemoryStore::new();
        let tree = store.insert_tree(Default::default()).unwrap();
        let raw = format!(
            "tree {}\nauthor Alice <a@x> 1600000000 +0200\n\
             committer Bob <b@x> 1600000500 -0000\n\nRebased\n",
            tree
        );
        let id = store.write_commit_object(raw.as_bytes()).unwrap();
        store.update_ref("refs/heads/main", &id).unwrap();

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        run(&store, &DisassembleOptions::new(&out)).unwrap();

        let dir = out.join(format!("2020-09-13_14-26-40+0200--{}--Rebased", &id[..8]));
        assert_eq!(fs::read_to_string(dir.join("author.txt")).unwrap(), "Alice <a@x>");
        assert_eq!(fs::read_to_string(dir.join("committer.txt")).unwrap(), "Bob <b@x>");
        assert_eq!(
            fs::read_to_string(dir.join("commit-time.txt")).unwrap(),
            "2020-09-13_12-35-00-0000"
        );
        assert!(dir.join("tree").is_dir());
    }

    #[test]
    fn test_refs_outside_selection_and_to_tags_are_skipped() {
        let history = linear_history();
        let tag = history
            .store
            .insert_object(ObjectKind::Tag, b"object x\ntype commit\n")
            .unwrap();
        history.store.update_ref("refs/tags/annotated", &tag).unwrap();
        history.store.update_ref("refs/heads/old", &history.a).unwrap();

        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let mut options = DisassembleOptions::new(&out);
        options.roots = vec![RootSelector::Name(history.a.clone())];

        let report = run(&history.store, &options).unwrap();
        assert_eq!(report.commits, 1);
        assert_eq!(report.refs, 1);
        assert!(out.join("refs/heads/old").exists());
        assert!(!out.join("refs/heads/main").exists());
        assert!(!out.join("refs/tags").exists());
    }

    #[test]
    fn test_unknown_root_fails_before_writing() {
        let history = linear_history();
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let mut options = DisassembleOptions::new(&out);
        options.roots = vec![RootSelector::Name("nope".into())];

        let result = run(&history.store, &options);
        assert!(matches!(result, Err(Error::UnknownRootReference { name }) if name == "nope"));
        assert!(dirs(&out).is_empty());
    }

    #[test]
    fn test_non_empty_output_is_refused_without_force() {
        let history = linear_history();
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("stray.txt"), "x").unwrap();

        let mut options = DisassembleOptions::new(temp.path());
        let result = run(&history.store, &options);
        assert!(matches!(result, Err(Error::OutputNotEmpty { .. })));

        options.allow_existing_output = true;
        assert_eq!(run(&history.store, &options).unwrap().commits, 3);
    }

    fn signed_store() -> (MemoryStore, String) {
        let store = MemoryStore::new();
        let tree = store.insert_tree(Default::default()).unwrap();
        let raw = format!(
            "tree {}\nauthor A <a@x> 1 +0000\ncommitter A <a@x> 1 +0000\n\
             gpgsig -----BEGIN PGP SIGNATURE-----\n \n abc\n -----END PGP SIGNATURE-----\n\nSigned\n",
            tree
        );
        let id = store.write_commit_object(raw.as_bytes()).unwrap();
        store.update_ref("refs/heads/main", &id).unwrap();
        (store, id)
    }

    #[test]
    fn test_signed_commit_needs_explicit_strip() {
        let (store, id) = signed_store();
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");

        match run(&store, &DisassembleOptions::new(&out)) {
            Err(Error::UnsupportedMetadata { id: failed, header, .. }) => {
                assert_eq!(failed, id);
                assert_eq!(header, "gpgsig");
            }
            other => panic!("expected UnsupportedMetadata, got {:?}", other),
        }

        let mut options = DisassembleOptions::new(&out);
        options.allow_existing_output = true;
        options.strip_unsupported = true;
        let report = run(&store, &options).unwrap();
        assert_eq!(report.stripped, vec![id]);
        assert_eq!(report.commits, 1);
    }

    fn store_with_times(author: &str, committer: &str) -> (MemoryStore, String) {
        let history = linear_history();
        let tree = history.store.insert_tree(Default::default()).unwrap();
        let raw = format!(
            "tree {}\nparent {}\nauthor A <a@x> {}\ncommitter A <a@x> {}\n\nFuture\n",
            tree, history.c, author, committer
        );
        let id = history.store.write_commit_object(raw.as_bytes()).unwrap();
        history.store.update_ref("refs/heads/main", &id).unwrap();
        (history.store, id)
    }

    #[test]
    fn test_author_time_past_year_9999_fails_before_writing() {
        let (store, id) = store_with_times("253402300800 +0000", "1 +0000");
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");

        match run(&store, &DisassembleOptions::new(&out)) {
            Err(Error::MalformedCommit { id: failed, message }) => {
                assert_eq!(failed, id);
                assert!(message.contains("out of range"), "{}", message);
            }
            other => panic!("expected MalformedCommit, got {:?}", other),
        }
        assert!(dirs(&out).is_empty());
    }

    #[test]
    fn test_commit_time_past_year_9999_fails_before_writing() {
        let (store, id) = store_with_times("1600000000 +0000", "253402300800 +0000");
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");

        assert!(matches!(
            run(&store, &DisassembleOptions::new(&out)),
            Err(Error::MalformedCommit { id: failed, .. }) if failed == id
        ));
        assert!(dirs(&out).is_empty());
    }

    #[test]
    fn test_load_graph_reports_shallow_history() {
        let store = MemoryStore::new();
        let tree = store.insert_tree(Default::default()).unwrap();
        let raw = format!(
            "tree {}\nparent 0000000000000000000000000000000000000001\n\
             author A 1 +0000\ncommitter A 1 +0000\n\nShallow\n",
            tree
        );
        store.write_commit_object(raw.as_bytes()).unwrap();

        assert!(matches!(
            load_graph(&store, 2),
            Err(Error::UnresolvedParent { parent, .. })
                if parent == "0000000000000000000000000000000000000001"
        ));
    }

    #[test]
    fn test_load_graph_names_malformed_commit() {
        let store = MemoryStore::new();
        let id = store.write_commit_object(b"not a commit\n\nat all").unwrap();
        assert!(matches!(
            load_graph(&store, 4),
            Err(Error::MalformedCommit { id: failed, .. }) if failed == id
        ));
    }
}
