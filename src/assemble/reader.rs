//! Reading a disassembled tree back into commit records.
//!
//! Every top-level directory other than `refs` (and hidden entries) is one
//! commit. The directory name is its identifier for the rest of the run.
//! All validation happens here, before anything is written to a repository.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::commit::{split_lines, Commit, Signature};
use crate::error::{Error, Result};
use crate::graph::CommitGraph;
use crate::layout::{self, read_optional_bytes, read_trimmed};
use crate::timestamp::Timestamp;

/// One commit directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDir {
    /// Directory name, the commit's identifier within the tree.
    pub name: String,
    pub path: PathBuf,
    pub author: Signature,
    pub committer: Signature,
    /// Names of the parent directories, in order.
    pub parents: Vec<String>,
    /// Message lines, raw bytes.
    pub message: Vec<Vec<u8>>,
}

impl CommitDir {
    /// Where this commit's files live.
    pub fn tree_path(&self) -> PathBuf {
        self.path.join(layout::TREE_DIR)
    }

    /// A commit record whose parents are directory names and whose tree is
    /// not known yet.
    fn to_commit(&self) -> Commit {
        Commit {
            id: None,
            tree: String::new(),
            parents: self.parents.clone(),
            author: self.author.clone(),
            committer: self.committer.clone(),
            extra_headers: Vec::new(),
            message: self.message.clone(),
        }
    }
}

/// Everything read from a disassembled tree.
#[derive(Debug, Clone, Default)]
pub struct ParsedTree {
    /// Commit directories in name order.
    pub commits: Vec<CommitDir>,
    /// `(ref name, target directory name)` in name order.
    pub refs: Vec<(String, String)>,
    /// Position in `commits` by directory name.
    index: HashMap<String, usize>,
}

impl ParsedTree {
    fn new(commits: Vec<CommitDir>, refs: Vec<(String, String)>) -> Self {
        let index = commits
            .iter()
            .enumerate()
            .map(|(position, dir)| (dir.name.clone(), position))
            .collect();
        Self {
            commits,
            refs,
            index,
        }
    }

    pub fn find(&self, name: &str) -> Option<&CommitDir> {
        self.index.get(name).map(|&position| &self.commits[position])
    }

    /// Build the commit graph, keyed by directory name, with the refs
    /// attached.
    pub fn to_graph(&self) -> Result<CommitGraph> {
        let mut graph = CommitGraph::build(
            self.commits
                .iter()
                .map(|dir| (dir.name.clone(), dir.to_commit()))
                .collect(),
        )?;
        for (name, target) in &self.refs {
            if !graph.insert_ref(name, target) {
                return Err(Error::UnresolvedRefTarget {
                    ref_name: name.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(graph)
    }
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read and validate the whole tree below `input`.
pub fn read_tree(input: &Path) -> Result<ParsedTree> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(input).map_err(|e| Error::path(input, e))? {
        let entry = entry.map_err(|e| Error::path(input, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == layout::REFS_DIR || name.starts_with('.') {
            continue;
        }
        if !entry.path().is_dir() {
            debug!("Ignoring top-level file {}", name);
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();

    let commits = paths
        .iter()
        .map(|path| read_commit_dir(path))
        .collect::<Result<Vec<_>>>()?;

    let known: BTreeSet<&str> = commits.iter().map(|c| c.name.as_str()).collect();
    for commit in &commits {
        if let Some(parent) = commit.parents.iter().find(|p| !known.contains(p.as_str())) {
            return Err(Error::UnresolvedParentName {
                directory: commit.name.clone(),
                parent: parent.clone(),
            });
        }
    }

    let refs = read_refs(input)?;
    if let Some((name, target)) = refs.iter().find(|(_, t)| !known.contains(t.as_str())) {
        return Err(Error::UnresolvedRefTarget {
            ref_name: name.clone(),
            target: target.clone(),
        });
    }

    Ok(ParsedTree::new(commits, refs))
}

/// Read one commit directory.
pub fn read_commit_dir(path: &Path) -> Result<CommitDir> {
    let name = dir_name(path);

    let author_time =
        Timestamp::parse_text_prefix(&name).ok_or_else(|| Error::UnparsableDirectoryName {
            directory: name.clone(),
        })?;

    let author_name = read_trimmed(&path.join(layout::AUTHOR_FILE))?;
    let committer_name = read_trimmed(&path.join(layout::COMMITTER_FILE))?;
    let (author_name, committer_name) = match (author_name, committer_name) {
        (Some(author), Some(committer)) => (author, committer),
        (Some(author), None) => (author.clone(), author),
        (None, Some(committer)) => (committer.clone(), committer),
        (None, None) => {
            return Err(Error::MissingAuthor {
                directory: name.clone(),
            })
        }
    };

    let committer_time = match read_trimmed(&path.join(layout::COMMIT_TIME_FILE))? {
        Some(text) => Timestamp::parse_text(&text).ok_or_else(|| Error::InvalidCommitTime {
            directory: name.clone(),
            value: text.clone(),
        })?,
        None => author_time,
    };

    let mut parents = Vec::new();
    while let Some(parent) = read_trimmed(&path.join(layout::parent_file(parents.len())))? {
        parents.push(parent);
    }

    let message = read_optional_bytes(&path.join(layout::MESSAGE_FILE))?.ok_or_else(|| {
        Error::MissingMessage {
            directory: name.clone(),
        }
    })?;

    Ok(CommitDir {
        name,
        path: path.to_path_buf(),
        author: Signature::new(author_name, author_time),
        committer: Signature::new(committer_name, committer_time),
        parents,
        message: split_lines(&message),
    })
}

/// Every ref file below `input/refs`, as `(ref name, target)`.
fn read_refs(input: &Path) -> Result<Vec<(String, String)>> {
    let refs_dir = input.join(layout::REFS_DIR);
    if !refs_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut refs = Vec::new();
    for entry in WalkDir::new(&refs_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(refs_dir.as_path()).to_path_buf();
            Error::path(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = layout::ref_name(input, entry.path()) else {
            debug!("Ignoring ref file with non UTF-8 path {}", entry.path().display());
            continue;
        };
        let target = read_trimmed(entry.path())?.unwrap_or_default();
        refs.push((name, target));
    }
    Ok(refs)
}
