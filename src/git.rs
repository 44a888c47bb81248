//! [`ObjectStore`] backed by the system `git` binary.
//!
//! Every operation runs `git --git-dir=<repo>`; the repository's own index
//! and work tree are never touched. Tree checkout and staging go through a
//! throwaway index file in a temporary directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::store::{ObjectEntry, ObjectKind, ObjectStore, RefEntry};

/// A repository accessed through the `git` command line.
#[derive(Debug, Clone)]
pub struct GitStore {
    git_dir: PathBuf,
}

/// Run a prepared command and return its stdout.
///
/// Failure to spawn and a non-zero exit both become [`Error::GitCommand`]
/// carrying `description` and git's stderr.
fn run(mut command: Command, description: &str) -> Result<Vec<u8>> {
    debug!("git {}", description);
    let output = command.output().map_err(|e| Error::GitCommand {
        command: description.to_string(),
        stderr: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::GitCommand {
            command: description.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(output.stdout)
}

fn stdout_text(stdout: Vec<u8>, description: &str) -> Result<String> {
    String::from_utf8(stdout).map_err(|_| Error::GitCommand {
        command: description.to_string(),
        stderr: "output is not valid UTF-8".to_string(),
    })
}

fn rev_parse(path: &Path, arg: &str) -> Result<PathBuf> {
    let mut command = Command::new("git");
    command.arg("-C").arg(path).args(["rev-parse", arg]);
    let description = format!("rev-parse {} in {}", arg, path.display());
    let stdout = stdout_text(run(command, &description)?, &description)?;
    let resolved = PathBuf::from(stdout.trim());
    resolved.canonicalize().map_err(|e| Error::path(resolved, e))
}

impl GitStore {
    /// Open the repository at `path`.
    ///
    /// `path` must be the top of a work tree, or a git dir itself (bare
    /// repository or `.git`). A directory that merely lies inside some other
    /// repository is rejected with [`Error::NotARepository`].
    pub fn open(path: &Path) -> Result<Self> {
        let git_dir = rev_parse(path, "--absolute-git-dir")?;
        let root = path.canonicalize().map_err(|e| Error::path(path, e))?;
        if git_dir == root {
            return Ok(Self { git_dir });
        }

        match rev_parse(path, "--show-toplevel") {
            Ok(toplevel) if toplevel == root => Ok(Self { git_dir }),
            _ => Err(Error::NotARepository {
                path: path.to_path_buf(),
                enclosing: Some(git_dir),
            }),
        }
    }

    /// Create a repository at `path` with `git init` and open it.
    pub fn init(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path).map_err(|e| Error::path(path, e))?;
        let mut command = Command::new("git");
        command.arg("init").arg("--quiet").arg(path);
        run(command, &format!("init {}", path.display()))?;
        Self::open(path)
    }

    /// Open `path` if it is a repository, otherwise create one there.
    ///
    /// A directory inside another repository gets a repository of its own.
    pub fn open_or_init(path: &Path) -> Result<Self> {
        match Self::open(path) {
            Ok(store) => Ok(store),
            Err(error) => {
                debug!("Creating a repository at {}: {}", path.display(), error);
                Self::init(path)
            }
        }
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg("--git-dir").arg(&self.git_dir);
        command
    }

    /// A git command that uses `index` instead of the repository's index.
    fn git_with_index(&self, index: &Path) -> Command {
        let mut command = self.git();
        command.env("GIT_INDEX_FILE", index);
        command
    }
}

fn scratch_index() -> Result<(TempDir, PathBuf)> {
    let dir = tempfile::Builder::new().prefix("histdir-index").tempdir()?;
    let index = dir.path().join("index");
    Ok((dir, index))
}

impl ObjectStore for GitStore {
    fn list_refs(&self) -> Result<Vec<RefEntry>> {
        let description = "for-each-ref";
        let mut command = self.git();
        command.args([
            "for-each-ref",
            "--format=%(objectname) %(objecttype) %(refname)",
        ]);
        let stdout = stdout_text(run(command, description)?, description)?;

        stdout
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| {
                // <id> <type> <name>
                let mut parts = line.splitn(3, ' ');
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(target), Some(kind), Some(name)) => Ok(RefEntry {
                        name: name.to_string(),
                        target: target.to_string(),
                        kind: kind.parse().map_err(|message| Error::GitCommand {
                            command: description.to_string(),
                            stderr: message,
                        })?,
                    }),
                    _ => Err(Error::GitCommand {
                        command: description.to_string(),
                        stderr: format!("unexpected output line '{}'", line),
                    }),
                }
            })
            .collect()
    }

    fn list_all_objects(&self) -> Result<Vec<ObjectEntry>> {
        let description = "cat-file --batch-all-objects --batch-check";
        let mut command = self.git();
        command.args(["cat-file", "--batch-all-objects", "--batch-check"]);
        let stdout = stdout_text(run(command, description)?, description)?;

        let mut objects = Vec::new();
        for line in stdout.lines().filter(|line| !line.is_empty()) {
            // <id> <type> <size>
            let mut parts = line.split(' ');
            let (Some(id), Some(kind)) = (parts.next(), parts.next()) else {
                return Err(Error::GitCommand {
                    command: description.to_string(),
                    stderr: format!("unexpected output line '{}'", line),
                });
            };
            match kind.parse::<ObjectKind>() {
                Ok(kind) => objects.push(ObjectEntry {
                    id: id.to_string(),
                    kind,
                }),
                Err(message) => debug!("Skipping object {}: {}", id, message),
            }
        }
        Ok(objects)
    }

    fn read_object(&self, id: &str) -> Result<Vec<u8>> {
        let mut command = self.git();
        command.args(["cat-file", "commit", id]);
        run(command, &format!("cat-file commit {}", id))
    }

    fn materialize_tree(&self, id: &str, destination: &Path) -> Result<()> {
        std::fs::create_dir_all(destination).map_err(|e| Error::path(destination, e))?;
        let (_guard, index) = scratch_index()?;

        let mut command = self.git_with_index(&index);
        command.args(["read-tree", id]);
        run(command, &format!("read-tree {}", id))?;

        let mut command = self.git_with_index(&index);
        command
            .arg("--work-tree")
            .arg(destination)
            .args(["checkout-index", "--all", "--force"])
            .current_dir(destination);
        run(
            command,
            &format!("checkout-index for {} into {}", id, destination.display()),
        )?;
        Ok(())
    }

    fn stage_tree(&self, source: &Path) -> Result<String> {
        let (_guard, index) = scratch_index()?;

        let mut command = self.git_with_index(&index);
        command
            .arg("--work-tree")
            .arg(source)
            .args(["add", "--all", "--force"])
            .current_dir(source);
        run(command, &format!("add --all {}", source.display()))?;

        let description = format!("write-tree for {}", source.display());
        let command = {
            let mut command = self.git_with_index(&index);
            command.arg("write-tree");
            command
        };
        let stdout = stdout_text(run(command, &description)?, &description)?;
        Ok(stdout.trim().to_string())
    }

    fn write_commit_object(&self, raw: &[u8]) -> Result<String> {
        let description = "hash-object -t commit -w --stdin";
        let spawn_error = |e: std::io::Error| Error::GitCommand {
            command: description.to_string(),
            stderr: e.to_string(),
        };

        let mut child = self
            .git()
            .args(["hash-object", "-t", "commit", "-w", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(raw).map_err(spawn_error)?;
        }
        let output = child.wait_with_output().map_err(spawn_error)?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: description.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(stdout_text(output.stdout, description)?.trim().to_string())
    }

    fn update_ref(&self, name: &str, id: &str) -> Result<()> {
        let mut command = self.git();
        command.args(["update-ref", name, id]);
        run(command, &format!("update-ref {} {}", name, id))?;
        Ok(())
    }
}
