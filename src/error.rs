//! # Error Handling
//!
//! This module defines the centralized error type for `histdir`. It uses the
//! `thiserror` library to describe every anticipated failure mode with a
//! message that names the commit, ref, or directory involved.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum covering all failures of the library.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! The variants fall into four groups:
//!
//! - Codec failures (`MalformedCommit`, `UnsupportedMetadata`).
//! - Unresolvable cross-references (`UnresolvedParent`, `UnresolvedParentName`,
//!   `UnresolvedRefTarget`, `UnknownRootReference`, `UnknownReference`).
//! - Malformed assembly input (`UnparsableDirectoryName`, `MissingAuthor`,
//!   `MissingMessage`, `ParentCycle`).
//! - Object store and filesystem failures (`GitCommand`, `Io`, `OutputNotEmpty`).
//!
//! Every error is fatal for the run. Nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for histdir operations
#[derive(Error, Debug)]
pub enum Error {
    /// The raw encoding of a commit object could not be parsed.
    #[error("Malformed commit {id}: {message}")]
    MalformedCommit { id: String, message: String },

    /// A commit carries a signature or similar block that cannot be expressed
    /// in the directory layout.
    #[error("Commit {id} carries unsupported metadata ({header}){}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    UnsupportedMetadata {
        id: String,
        header: String,
        /// Optional hint for how to proceed anyway
        hint: Option<String>,
    },

    /// A commit names a parent that is not part of the loaded object set.
    #[error("Commit {commit} references parent {parent}, which is not in the object store")]
    UnresolvedParent { commit: String, parent: String },

    /// A parent file in a commit directory names no known directory.
    #[error("Directory {directory}: parent {parent} does not match any commit directory")]
    UnresolvedParentName { directory: String, parent: String },

    /// A ref file names no known commit directory.
    #[error("Ref {ref_name} points at {target}, which does not match any commit directory")]
    UnresolvedRefTarget { ref_name: String, target: String },

    /// Parent files in the directory tree form a loop.
    #[error("Commit directories form a parent cycle: {}", directories.join(" -> "))]
    ParentCycle { directories: Vec<String> },

    /// Two commits were assigned the same directory name.
    #[error("Commits {first} and {second} would both be written to directory {name}")]
    DuplicateAssignedName {
        name: String,
        first: String,
        second: String,
    },

    /// A root given by the user resolves to no commit.
    #[error("Unknown root reference: {name}")]
    UnknownRootReference { name: String },

    /// A graph lookup was made for an identifier or ref that does not exist.
    #[error("Unknown reference: {name}")]
    UnknownReference { name: String },

    /// A commit directory name does not start with the timestamp prefix.
    #[error("Directory {directory}: name does not start with a timestamp of the form YYYY-MM-DD_HH-MM-SS+hhmm")]
    UnparsableDirectoryName { directory: String },

    /// A commit directory has neither an author nor a committer file.
    #[error("Directory {directory}: neither author.txt nor committer.txt is present")]
    MissingAuthor { directory: String },

    /// A commit directory has no message file.
    #[error("Directory {directory}: message.txt is missing")]
    MissingMessage { directory: String },

    /// A git invocation failed.
    ///
    /// Carries the subcommand that was run and whatever git wrote to stderr.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// A path lies inside a repository without being its root.
    #[error("{} is not the root of a git repository{}", path.display(), enclosing.as_ref().map(|e| format!(" (it is inside {})", e.display())).unwrap_or_default())]
    NotARepository {
        path: PathBuf,
        /// Git dir of the repository that contains `path`.
        enclosing: Option<PathBuf>,
    },

    /// The output directory of a disassembly already has content.
    #[error("Output directory {} is not empty{}", path.display(), hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    OutputNotEmpty {
        path: PathBuf,
        hint: Option<String>,
    },

    /// An I/O error on a specific path.
    #[error("I/O error on {}: {source}", path.display())]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A commit directory has a commit-time file that is not a timestamp.
    #[error("Directory {directory}: commit-time.txt does not hold a timestamp of the form YYYY-MM-DD_HH-MM-SS+hhmm: {value}")]
    InvalidCommitTime { directory: String, value: String },

    /// An object the store was asked for is not there, or has another kind.
    #[error("Object {id} is not a {expected} in the object store")]
    MissingObject { id: String, expected: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// The worker pool for reading objects could not be created.
    #[error("Thread pool error: {message}")]
    ThreadPool { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an I/O error together with the path it happened on.
    pub fn path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Path {
            path: path.into(),
            source,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
