//! # histdir
//!
//! Turns the commit history of a git repository into an ordinary directory
//! tree, one directory per commit, and turns such a tree back into commits.
//! In between, history can be rewritten with nothing but a file manager and a
//! text editor: reword a message by editing `message.txt`, reparent a commit
//! by editing `parent0.txt`, fix a file in an old snapshot by editing it
//! under `tree/`.
//!
//! ## Quick Example
//!
//! ```
//! use histdir::context::{AssembleOptions, DisassembleOptions};
//! use histdir::store::memory::MemoryStore;
//! use histdir::store::ObjectStore;
//! use histdir::{assemble, disassemble};
//!
//! let source = MemoryStore::new();
//! let first = source
//!     .commit_files(&[("README.md", "# hi\n")], &[], 1_600_000_000, "Initial\n")
//!     .unwrap();
//! source.update_ref("refs/heads/main", &first).unwrap();
//!
//! let dir = tempfile::tempdir().unwrap();
//! let out = dir.path().join("history");
//! disassemble::run(&source, &DisassembleOptions::new(&out)).unwrap();
//!
//! let target = MemoryStore::new();
//! let report = assemble::run(&target, &AssembleOptions::new(&out)).unwrap();
//! assert_eq!(report.commits[0].1, first);
//! ```
//!
//! ## Layout
//!
//! ```text
//! <root>/
//!   2020-09-13_12-26-40+0000--1a2b3c4d--Initial/
//!     tree/             files of the commit
//!     message.txt       full commit message
//!     author.txt        "Name <email>"
//!     committer.txt     only if it differs from the author
//!     commit-time.txt   only if it differs from the author time
//!     parent0.txt       name of the first parent directory, and so on
//!   refs/heads/main     name of the commit directory the ref points at
//! ```
//!
//! ## Core Concepts
//!
//! - **Commit codec (`commit`)**: byte-exact parsing and serialization of
//!   commit objects.
//! - **Graph (`graph`, `reachability`)**: an arena of commits with parent and
//!   child edges, and the walk that selects which commits to export.
//! - **Naming (`naming`, `timestamp`)**: the deterministic directory name of
//!   each commit.
//! - **Object store (`store`, `git`)**: the handful of repository primitives
//!   the tool needs, behind a trait.
//! - **Pipelines (`disassemble`, `assemble`)**: the two directions.

pub mod assemble;
pub mod commit;
pub mod context;
pub mod disassemble;
pub mod error;
pub mod git;
pub mod graph;
pub mod layout;
pub mod naming;
pub mod output;
pub mod reachability;
pub mod store;
pub mod timestamp;

#[cfg(test)]
mod graph_proptest;
