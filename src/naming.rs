//! # Identifier Assignment
//!
//! Every exported commit gets a directory name that a person can read:
//!
//! ```text
//! <author time>--<first 8 chars of the id>--<message preview>
//! 2021-03-04_05-06-07+0100--0123abcd--Fix.the.parser
//! ```
//!
//! The name stands in for the commit id wherever the directory tree refers to
//! a commit (parent files, ref files). It is a pure function of the author
//! time, the id and the message, so exporting the same history twice gives
//! the same names.

use std::collections::{BTreeMap, HashMap};

use crate::commit::Commit;
use crate::error::{Error, Result};
use crate::graph::{CommitGraph, NodeId};

/// Separator between the parts of an assigned name.
pub const SEPARATOR: &str = "--";

/// Number of id characters embedded in a name.
pub const ID_PREFIX_LEN: usize = 8;

/// Maximum length of the message preview before trimming dots.
pub const PREVIEW_LEN: usize = 20;

/// Replace runs of two or more dots with a single dot.
///
/// Repeats until no `..` remains, so the result is a fixed point.
pub fn collapse_dots(text: &str) -> String {
    let mut text = text.to_string();
    while text.contains("..") {
        text = text.replace("..", ".");
    }
    text
}

/// A short filesystem-safe summary of a message.
///
/// Lines are joined with spaces, every character other than an ASCII letter
/// or digit becomes `.`, runs of dots collapse to one, the result is cut to
/// [`PREVIEW_LEN`] characters and stray dots at either end are removed.
/// Bytes that are not UTF-8 count as non-alphanumeric.
pub fn message_preview(message: &[Vec<u8>]) -> String {
    let joined = message.join(&b' ');
    let mapped: String = String::from_utf8_lossy(&joined)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '.' })
        .collect();
    let collapsed = collapse_dots(&mapped);
    let cut = &collapsed[..collapsed.len().min(PREVIEW_LEN)];
    cut.trim_matches('.').to_string()
}

/// The directory name for one commit.
pub fn assigned_name(commit: &Commit) -> Result<String> {
    let id = commit.display_id();
    let time = commit
        .author
        .time
        .to_text()
        .ok_or_else(|| Error::MalformedCommit {
            id: id.to_string(),
            message: format!("author time {} is out of range", commit.author.time.to_raw()),
        })?;
    let prefix: String = id.chars().take(ID_PREFIX_LEN).collect();
    Ok(format!(
        "{}{}{}{}{}",
        time,
        SEPARATOR,
        prefix,
        SEPARATOR,
        message_preview(&commit.message)
    ))
}

/// Names for every node in `nodes`.
///
/// Fails with [`Error::DuplicateAssignedName`] if two commits would share a
/// directory, which needs identical author time, message preview and id
/// prefix.
pub fn assign_names<'a>(
    graph: &CommitGraph,
    nodes: impl IntoIterator<Item = &'a NodeId>,
) -> Result<BTreeMap<NodeId, String>> {
    let mut names = BTreeMap::new();
    let mut owners: HashMap<String, NodeId> = HashMap::new();

    for &id in nodes {
        let name = assigned_name(&graph.node(id).commit)?;
        if let Some(previous) = owners.insert(name.clone(), id) {
            return Err(Error::DuplicateAssignedName {
                name,
                first: graph.node(previous).key.clone(),
                second: graph.node(id).key.clone(),
            });
        }
        names.insert(id, name);
    }

    Ok(names)
}
