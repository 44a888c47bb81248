//! Shared test utilities for the E2E tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let repo = GitFixture::new();
//!     let a = repo.commit(&[("a.txt", "a\n")], "First\n");
//!     histdir().arg("disassemble").arg(repo.path()).arg(repo.out()).assert().success();
//! }
//! ```
//!
//! Fixtures that run `git` need it on `PATH`; tests using them are gated on
//! the `integration-tests` feature.

use assert_fs::prelude::*;
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{dir_names, histdir, GitFixture};
}

/// The `histdir` binary, with color and logging pinned down.
pub fn histdir() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("histdir");
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

/// Sorted names of the entries directly below `dir`.
pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("Failed to read directory")
        .map(|entry| {
            entry
                .expect("Failed to read entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

/// A scratch git repository plus room for disassembled trees.
///
/// Commits are made with fixed identities and dates, one minute apart, so
/// directory names are predictable.
pub struct GitFixture {
    temp_dir: assert_fs::TempDir,
    clock: Cell<i64>,
}

impl GitFixture {
    /// An empty repository at `<temp>/repo` on branch `main`.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
            clock: Cell::new(1_600_000_000),
        };
        std::fs::create_dir_all(fixture.path()).expect("Failed to create repo directory");
        fixture.git(&["init", "--quiet", "--initial-branch=main"]);
        fixture
    }

    /// The repository's work tree.
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().join("repo")
    }

    /// A fresh path next to the repository, for trees and second repos.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// The default disassembly target.
    pub fn out(&self) -> PathBuf {
        self.scratch("out")
    }

    /// Run `git` in the repository and return trimmed stdout.
    pub fn git(&self, args: &[&str]) -> String {
        git_in(&self.path(), args, None)
    }

    /// Run `git` in the repository with `input` on stdin.
    pub fn git_with_input(&self, args: &[&str], input: &str) -> String {
        git_in(&self.path(), args, Some(input))
    }

    /// Replace the work tree files listed in `files`, commit everything with
    /// `message` and return the new commit id.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> String {
        let work = self.temp_dir.child("repo");
        for (path, content) in files {
            work.child(path).write_str(content).expect("Failed to write file");
        }
        self.git(&["add", "--all"]);
        let when = self.tick();
        git_in_env(
            &self.path(),
            &["commit", "--quiet", "--allow-empty", "--cleanup=verbatim", "-m", message],
            &when,
        );
        self.git(&["rev-parse", "HEAD"])
    }

    /// Merge `branch` into the current branch with a merge commit.
    pub fn merge(&self, branch: &str, message: &str) -> String {
        let when = self.tick();
        git_in_env(
            &self.path(),
            &["merge", "--quiet", "--no-ff", "--cleanup=verbatim", "-m", message, branch],
            &when,
        );
        self.git(&["rev-parse", "HEAD"])
    }

    fn tick(&self) -> String {
        let now = self.clock.get();
        self.clock.set(now + 60);
        format!("{} +0000", now)
    }

    /// Get the path to the temporary directory.
    #[allow(dead_code)]
    pub fn temp_dir(&self) -> &assert_fs::TempDir {
        &self.temp_dir
    }
}

impl Default for GitFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `git` in `dir` and return trimmed stdout, panicking on failure.
pub fn git_in(dir: &Path, args: &[&str], input: Option<&str>) -> String {
    let mut command = Command::new("git");
    command.arg("-C").arg(dir).args(args);
    run(command, args, input)
}

fn git_in_env(dir: &Path, args: &[&str], when: &str) -> String {
    let mut command = Command::new("git");
    command
        .arg("-C")
        .arg(dir)
        .args(args)
        .env("GIT_AUTHOR_NAME", "Test Author")
        .env("GIT_AUTHOR_EMAIL", "author@example.com")
        .env("GIT_AUTHOR_DATE", when)
        .env("GIT_COMMITTER_NAME", "Test Author")
        .env("GIT_COMMITTER_EMAIL", "author@example.com")
        .env("GIT_COMMITTER_DATE", when)
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1");
    run(command, args, None)
}

fn run(mut command: Command, args: &[&str], input: Option<&str>) -> String {
    use std::io::Write;

    command.stdin(if input.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    command.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = command.spawn().expect("Failed to run git");
    if let Some(input) = input {
        child
            .stdin
            .take()
            .expect("stdin is piped")
            .write_all(input.as_bytes())
            .expect("Failed to write to git");
    }
    let output = child.wait_with_output().expect("Failed to wait for git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
