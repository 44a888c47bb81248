//! Run configuration.
//!
//! Each run builds one of these and passes it down explicitly; no module
//! keeps input or output paths in global state.

use std::path::PathBuf;

use crate::reachability::RootSelector;

/// Default number of worker threads for reading commit objects.
///
/// Each read may spawn a `git` process, so this stays small.
pub const DEFAULT_JOBS: usize = 8;

/// Options for turning a repository into a directory tree.
#[derive(Debug, Clone)]
pub struct DisassembleOptions {
    /// Directory to create the tree in.
    pub output: PathBuf,
    /// Where discovery starts. Empty means every branch head.
    pub roots: Vec<RootSelector>,
    /// Also follow child edges during discovery.
    pub include_descendants: bool,
    /// Drop signatures and other unsupported blocks instead of failing.
    pub strip_unsupported: bool,
    /// Allow writing into a non-empty output directory.
    pub allow_existing_output: bool,
    /// Worker threads for reading commits.
    pub jobs: usize,
}

impl DisassembleOptions {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            roots: Vec::new(),
            include_descendants: false,
            strip_unsupported: false,
            allow_existing_output: false,
            jobs: DEFAULT_JOBS,
        }
    }

    /// The root selectors to use, with the empty default filled in.
    pub fn effective_roots(&self) -> Vec<RootSelector> {
        if self.roots.is_empty() {
            vec![RootSelector::AllHeads]
        } else {
            self.roots.clone()
        }
    }
}

/// Options for turning a directory tree back into a repository.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Root of the disassembled tree.
    pub input: PathBuf,
}

impl AssembleOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
