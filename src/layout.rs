//! File and directory names of a disassembled history.
//!
//! ```text
//! <output>/
//!   <assigned name>/
//!     tree/            full file tree of the commit
//!     message.txt      exact message bytes
//!     author.txt       author name
//!     committer.txt    only when it differs from the author
//!     commit-time.txt  only when it differs from the author time
//!     parent0.txt      assigned name of each parent, no gaps
//!     parent1.txt
//!   refs/
//!     heads/main       assigned name the ref points at
//!     tags/v1.0
//! ```
//!
//! Every file except `message.txt` and the tree contents is whitespace
//! trimmed on read, so hand edits with a trailing newline are fine.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const REFS_DIR: &str = "refs";
pub const TREE_DIR: &str = "tree";
pub const MESSAGE_FILE: &str = "message.txt";
pub const AUTHOR_FILE: &str = "author.txt";
pub const COMMITTER_FILE: &str = "committer.txt";
pub const COMMIT_TIME_FILE: &str = "commit-time.txt";

/// `parent<index>.txt`
pub fn parent_file(index: usize) -> String {
    format!("parent{}.txt", index)
}

/// Where the file for ref `name` (e.g. `refs/heads/main`) lives under `root`.
pub fn ref_path(root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .fold(root.to_path_buf(), |path, component| path.join(component))
}

/// The ref name for a file below `root/refs`.
pub fn ref_name(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let components = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(components.join("/"))
}

/// Write `contents` to `path`, naming the path on failure.
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).map_err(|e| Error::path(path, e))
}

/// Read a file verbatim. `Ok(None)` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::path(path, e)),
    }
}

/// Read a file's exact bytes. `Ok(None)` when it does not exist.
pub fn read_optional_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::path(path, e)),
    }
}

/// Read a metadata file with surrounding whitespace removed.
pub fn read_trimmed(path: &Path) -> Result<Option<String>> {
    Ok(read_optional(path)?.map(|text| text.trim().to_string()))
}
