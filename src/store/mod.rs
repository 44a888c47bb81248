//! # Object Store
//!
//! histdir never reads or writes the repository's object database itself.
//! Everything it needs from the repository goes through [`ObjectStore`],
//! which [`crate::git::GitStore`] implements on top of the `git` binary and
//! [`memory::MemoryStore`] implements in memory for tests.
//!
//! Implementations must be `Sync`: raw commit reads run on a worker pool.
//! Operations that change the repository (`stage_tree`,
//! `write_commit_object`, `update_ref`) are only ever called from one thread,
//! in dependency order.

pub mod memory;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;

/// Kind of an object in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "commit" => Ok(ObjectKind::Commit),
            "tree" => Ok(ObjectKind::Tree),
            "blob" => Ok(ObjectKind::Blob),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(format!("unknown object kind '{}'", other)),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tree => "tree",
            ObjectKind::Blob => "blob",
            ObjectKind::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// A ref and the object it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefEntry {
    /// Full name, e.g. `refs/heads/main`.
    pub name: String,
    pub target: String,
    pub kind: ObjectKind,
}

/// An object listed by [`ObjectStore::list_all_objects`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub id: String,
    pub kind: ObjectKind,
}

/// Primitive operations histdir needs from a repository.
pub trait ObjectStore: Sync {
    /// Every ref with its target.
    fn list_refs(&self) -> Result<Vec<RefEntry>>;

    /// Every object, including unreferenced ones.
    fn list_all_objects(&self) -> Result<Vec<ObjectEntry>>;

    /// Raw bytes of the commit object `id`.
    fn read_object(&self, id: &str) -> Result<Vec<u8>>;

    /// Populate `destination` with the file tree of commit `id`, without any
    /// repository bookkeeping files.
    fn materialize_tree(&self, id: &str, destination: &Path) -> Result<()>;

    /// Store the files below `source` as a tree and return its id.
    fn stage_tree(&self, source: &Path) -> Result<String>;

    /// Store pre-serialized commit bytes and return the new commit's id.
    fn write_commit_object(&self, raw: &[u8]) -> Result<String>;

    /// Point ref `name` at `id`, creating it if needed.
    fn update_ref(&self, name: &str, id: &str) -> Result<()>;
}
