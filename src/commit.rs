//! # Commit Codec
//!
//! Parses the raw encoding of a git commit object into a [`Commit`] and
//! serializes a [`Commit`] back into the exact bytes git hashes.
//!
//! ## Encoding
//!
//! ```text
//! tree <tree-id>
//! parent <parent-id>            (zero or more)
//! author <name> <seconds> <offset>
//! committer <name> <seconds> <offset>
//! <extra headers>               (zero or more, see below)
//!
//! <message>
//! ```
//!
//! Headers after the committer line are kept in order as [`ExtraHeader`]s.
//! A single-line header such as `encoding` is a marker left by some other
//! tool; it carries nothing histdir understands. A header followed by
//! continuation lines (each starting with a space), such as `gpgsig`, is an
//! opaque block. Both are captured verbatim so that
//! `serialize(parse(x)) == x` for every commit histdir accepts.
//!
//! The message is everything after the first empty line, split on `\n`. A
//! message ending in a newline therefore ends in an empty line, which is how
//! the trailing newline survives the round trip.
//!
//! Headers must be UTF-8. The message is kept as raw bytes: git records
//! messages in whatever `encoding` names, and those bytes are hashed as-is.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;

fn signature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+) (-?\d+) ([+-]\d{4})$").expect("signature pattern is valid")
    })
}

/// A name (conventionally `Name <email>`) plus the time it signed at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub time: Timestamp,
}

impl Signature {
    pub fn new(name: impl Into<String>, time: Timestamp) -> Self {
        Self {
            name: name.into(),
            time,
        }
    }

    fn parse(line: &str) -> Option<Self> {
        let captures = signature_pattern().captures(line)?;
        let time = Timestamp::from_raw(&captures[2], &captures[3]).ok()?;
        Some(Self::new(&captures[1], time))
    }

    fn to_raw(&self) -> String {
        format!("{} {}", self.name, self.time.to_raw())
    }
}

/// A header line following the committer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraHeader {
    /// A single header line, e.g. `encoding ISO-8859-1`.
    Marker(String),
    /// A header with continuation lines, e.g. a `gpgsig` block. Stored with
    /// its lines joined by `\n`, without a trailing newline.
    Unsupported(String),
}

impl ExtraHeader {
    /// The raw header text as it appears in the commit.
    pub fn raw(&self) -> &str {
        match self {
            ExtraHeader::Marker(raw) | ExtraHeader::Unsupported(raw) => raw,
        }
    }

    /// The header name, e.g. `gpgsig`.
    pub fn key(&self) -> &str {
        let raw = self.raw();
        raw.split([' ', '\n']).next().unwrap_or(raw)
    }
}

/// A commit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Object id. `None` for a commit that has not been written yet.
    pub id: Option<String>,
    pub tree: String,
    pub parents: Vec<String>,
    pub author: Signature,
    pub committer: Signature,
    pub extra_headers: Vec<ExtraHeader>,
    /// Message lines as raw bytes, order-significant. Joined with `\n` they
    /// give the exact message bytes.
    pub message: Vec<Vec<u8>>,
}

/// Split message bytes into lines on `\n`. Always yields at least one line.
pub fn split_lines(message: &[u8]) -> Vec<Vec<u8>> {
    message.split(|b| *b == b'\n').map(<[u8]>::to_vec).collect()
}

impl Commit {
    /// The message bytes as they appear in the object.
    pub fn message_bytes(&self) -> Vec<u8> {
        self.message.join(&b'\n')
    }

    /// The first header whose content histdir cannot recreate, if any.
    pub fn first_unsupported(&self) -> Option<&ExtraHeader> {
        self.extra_headers
            .iter()
            .find(|h| matches!(h, ExtraHeader::Unsupported(_)))
    }

    /// The id, or an empty string for unwritten commits. Used in messages.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }
}

/// Parse the raw bytes of the commit object `id`.
pub fn parse(id: &str, raw: &[u8]) -> Result<Commit> {
    let malformed = |message: &str| Error::MalformedCommit {
        id: id.to_string(),
        message: message.to_string(),
    };

    let split = raw
        .windows(2)
        .position(|pair| pair == b"\n\n")
        .ok_or_else(|| malformed("missing blank line before the message"))?;
    let (header, message) = (&raw[..split], &raw[split + 2..]);
    let header =
        std::str::from_utf8(header).map_err(|_| malformed("header is not valid UTF-8"))?;

    let mut lines = header.split('\n').peekable();

    let tree = lines
        .next()
        .and_then(|line| line.strip_prefix("tree "))
        .filter(|tree| !tree.is_empty())
        .ok_or_else(|| malformed("first line is not a tree line"))?
        .to_string();

    let mut parents = Vec::new();
    while let Some(parent) = lines.peek().and_then(|line| line.strip_prefix("parent ")) {
        parents.push(parent.to_string());
        lines.next();
    }

    let author = lines
        .next()
        .and_then(|line| line.strip_prefix("author "))
        .ok_or_else(|| malformed("missing author line"))?;
    let author = Signature::parse(author).ok_or_else(|| {
        malformed(&format!(
            "author line does not match '<name> <seconds> <offset>': {}",
            author
        ))
    })?;

    let committer = lines
        .next()
        .and_then(|line| line.strip_prefix("committer "))
        .ok_or_else(|| malformed("missing committer line"))?;
    let committer = Signature::parse(committer).ok_or_else(|| {
        malformed(&format!(
            "committer line does not match '<name> <seconds> <offset>': {}",
            committer
        ))
    })?;

    let mut extra_headers = Vec::new();
    while let Some(line) = lines.next() {
        if line.starts_with(' ') {
            return Err(malformed("continuation line without a header"));
        }
        let mut block = vec![line];
        while let Some(continuation) = lines.next_if(|next| next.starts_with(' ')) {
            block.push(continuation);
        }
        extra_headers.push(if block.len() == 1 {
            ExtraHeader::Marker(line.to_string())
        } else {
            ExtraHeader::Unsupported(block.join("\n"))
        });
    }

    Ok(Commit {
        id: Some(id.to_string()),
        tree,
        parents,
        author,
        committer,
        extra_headers,
        message: split_lines(message),
    })
}

/// Serialize a commit into the bytes git stores and hashes.
pub fn serialize(commit: &Commit) -> Vec<u8> {
    let mut out = String::new();
    out.push_str("tree ");
    out.push_str(&commit.tree);
    out.push('\n');
    for parent in &commit.parents {
        out.push_str("parent ");
        out.push_str(parent);
        out.push('\n');
    }
    out.push_str("author ");
    out.push_str(&commit.author.to_raw());
    out.push('\n');
    out.push_str("committer ");
    out.push_str(&commit.committer.to_raw());
    out.push('\n');
    for header in &commit.extra_headers {
        out.push_str(header.raw());
        out.push('\n');
    }
    out.push('\n');
    let mut out = out.into_bytes();
    out.extend_from_slice(&commit.message_bytes());
    out
}
