//! An [`ObjectStore`] held entirely in memory.
//!
//! Object ids are derived from content with `DefaultHasher`, so writing the
//! same bytes twice yields the same id within a build. Trees are plain maps
//! from relative path to file content.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use walkdir::WalkDir;

use super::{ObjectEntry, ObjectKind, ObjectStore, RefEntry};
use crate::error::{Error, Result};

/// Files of one tree, keyed by path relative to the tree root.
pub type TreeFiles = BTreeMap<PathBuf, Vec<u8>>;

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, (ObjectKind, Vec<u8>)>,
    trees: BTreeMap<String, TreeFiles>,
    refs: BTreeMap<String, String>,
    commit_writes: usize,
}

/// In-memory repository.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn content_id(kind: ObjectKind, content: &[u8]) -> String {
    let digest = |salt: u8| {
        let mut hasher = DefaultHasher::new();
        salt.hash(&mut hasher);
        kind.to_string().hash(&mut hasher);
        content.hash(&mut hasher);
        hasher.finish()
    };
    format!(
        "{:016x}{:016x}{:08x}",
        digest(1),
        digest(2),
        digest(3) & 0xffff_ffff
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| Error::LockPoisoned {
            context: "memory object store".to_string(),
        })
    }

    /// Store a tree and return its id.
    pub fn insert_tree(&self, files: TreeFiles) -> Result<String> {
        let mut content = Vec::new();
        for (path, data) in &files {
            content.extend_from_slice(path.to_string_lossy().as_bytes());
            content.push(0);
            content.extend_from_slice(&(data.len() as u64).to_le_bytes());
            content.extend_from_slice(data);
        }
        let id = content_id(ObjectKind::Tree, &content);
        let mut state = self.lock()?;
        state
            .objects
            .insert(id.clone(), (ObjectKind::Tree, Vec::new()));
        state.trees.insert(id.clone(), files);
        Ok(id)
    }

    /// Store an object of any kind and return its id.
    pub fn insert_object(&self, kind: ObjectKind, raw: &[u8]) -> Result<String> {
        let id = content_id(kind, raw);
        self.lock()?.objects.insert(id.clone(), (kind, raw.to_vec()));
        Ok(id)
    }

    /// Store a tree of `files` and a commit on top of it, authored and
    /// committed by `Test <test@example.com>` at `seconds` UTC.
    pub fn commit_files(
        &self,
        files: &[(&str, &str)],
        parents: &[&str],
        seconds: i64,
        message: &str,
    ) -> Result<String> {
        let tree = self.insert_tree(
            files
                .iter()
                .map(|(path, content)| (PathBuf::from(path), content.as_bytes().to_vec()))
                .collect(),
        )?;
        let mut raw = format!("tree {}\n", tree);
        for parent in parents {
            raw.push_str(&format!("parent {}\n", parent));
        }
        raw.push_str(&format!(
            "author Test <test@example.com> {seconds} +0000\n\
             committer Test <test@example.com> {seconds} +0000\n\n{message}"
        ));
        self.write_commit_object(raw.as_bytes())
    }

    /// The files of tree `id`.
    pub fn tree_files(&self, id: &str) -> Result<TreeFiles> {
        self.lock()?
            .trees
            .get(id)
            .cloned()
            .ok_or_else(|| Error::MissingObject {
                id: id.to_string(),
                expected: ObjectKind::Tree.to_string(),
            })
    }

    /// All refs, name to target.
    pub fn refs(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.lock()?.refs.clone())
    }

    /// How many commit objects have been written through
    /// [`ObjectStore::write_commit_object`].
    pub fn commit_writes(&self) -> Result<usize> {
        Ok(self.lock()?.commit_writes)
    }

    fn tree_of_commit(&self, id: &str) -> Result<String> {
        let raw = self.read_object(id)?;
        let text = String::from_utf8_lossy(&raw);
        text.lines()
            .next()
            .and_then(|line| line.strip_prefix("tree "))
            .map(str::to_string)
            .ok_or_else(|| Error::MalformedCommit {
                id: id.to_string(),
                message: "first line is not a tree line".to_string(),
            })
    }
}

impl ObjectStore for MemoryStore {
    fn list_refs(&self) -> Result<Vec<RefEntry>> {
        let state = self.lock()?;
        Ok(state
            .refs
            .iter()
            .map(|(name, target)| RefEntry {
                name: name.clone(),
                target: target.clone(),
                kind: state
                    .objects
                    .get(target)
                    .map(|(kind, _)| *kind)
                    .unwrap_or(ObjectKind::Commit),
            })
            .collect())
    }

    fn list_all_objects(&self) -> Result<Vec<ObjectEntry>> {
        Ok(self
            .lock()?
            .objects
            .iter()
            .map(|(id, (kind, _))| ObjectEntry {
                id: id.clone(),
                kind: *kind,
            })
            .collect())
    }

    fn read_object(&self, id: &str) -> Result<Vec<u8>> {
        match self.lock()?.objects.get(id) {
            Some((ObjectKind::Commit, raw)) => Ok(raw.clone()),
            _ => Err(Error::MissingObject {
                id: id.to_string(),
                expected: ObjectKind::Commit.to_string(),
            }),
        }
    }

    fn materialize_tree(&self, id: &str, destination: &Path) -> Result<()> {
        let tree = self.tree_of_commit(id)?;
        let files = self.tree_files(&tree)?;
        fs::create_dir_all(destination).map_err(|e| Error::path(destination, e))?;
        for (relative, content) in files {
            let path = destination.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::path(parent, e))?;
            }
            fs::write(&path, content).map_err(|e| Error::path(&path, e))?;
        }
        Ok(())
    }

    fn stage_tree(&self, source: &Path) -> Result<String> {
        let mut files = TreeFiles::new();
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(source).to_path_buf();
                Error::path(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(source)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path().to_path_buf());
            let content = fs::read(entry.path()).map_err(|e| Error::path(entry.path(), e))?;
            files.insert(relative, content);
        }
        self.insert_tree(files)
    }

    fn write_commit_object(&self, raw: &[u8]) -> Result<String> {
        let id = self.insert_object(ObjectKind::Commit, raw)?;
        self.lock()?.commit_writes += 1;
        Ok(id)
    }

    fn update_ref(&self, name: &str, id: &str) -> Result<()> {
        self.lock()?.refs.insert(name.to_string(), id.to_string());
        Ok(())
    }
}
