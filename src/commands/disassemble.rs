//! # Disassemble Command Implementation
//!
//! Implements `histdir disassemble <REPO> <OUTPUT>`: opens the repository
//! through `git`, turns the root flags into selectors and writes the
//! directory tree.
//!
//! ## Root Selection
//!
//! - `--add <REF|ID>` (repeatable): a branch, tag, full ref name, commit id or
//!   unique id prefix.
//! - `--add-heads`: every branch head. Implied when no other selector is given.
//! - `--add-tags`: every tag that points at a commit.
//! - `--all`: every commit object, including unreferenced ones.
//!
//! Ancestors of the roots are always exported. `--descendants` also pulls in
//! everything built on top of them.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use histdir::context::{DisassembleOptions, DEFAULT_JOBS};
use histdir::disassemble;
use histdir::git::GitStore;
use histdir::output::{count, emoji, OutputConfig};
use histdir::reachability::RootSelector;

/// Write the commits of a repository out as one directory per commit
#[derive(Args, Debug)]
pub struct DisassembleArgs {
    /// Repository to read (work tree or bare)
    #[arg(value_name = "REPO")]
    pub repo: PathBuf,

    /// Directory to write the tree into
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Start from this ref or commit id (repeatable)
    #[arg(long = "add", value_name = "REF|ID")]
    pub add: Vec<String>,

    /// Start from every branch head
    #[arg(long)]
    pub add_heads: bool,

    /// Start from every tag
    #[arg(long)]
    pub add_tags: bool,

    /// Start from every commit in the object database
    #[arg(long)]
    pub all: bool,

    /// Also export descendants of the selected commits
    #[arg(long)]
    pub descendants: bool,

    /// Drop signatures instead of failing on signed commits
    #[arg(long)]
    pub strip_signatures: bool,

    /// Number of concurrent commit reads
    #[arg(short, long, value_name = "N", env = "HISTDIR_JOBS", default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    /// Write into OUTPUT even if it is not empty
    #[arg(short, long)]
    pub force: bool,
}

impl DisassembleArgs {
    /// Root selectors: `--all`, `--add-heads`, `--add-tags`, then every
    /// `--add` in the order given.
    pub fn root_selectors(&self) -> Vec<RootSelector> {
        let mut roots = Vec::new();
        if self.all {
            roots.push(RootSelector::AllCommits);
        }
        if self.add_heads {
            roots.push(RootSelector::AllHeads);
        }
        if self.add_tags {
            roots.push(RootSelector::AllTags);
        }
        roots.extend(self.add.iter().cloned().map(RootSelector::Name));
        roots
    }

    fn to_options(&self) -> DisassembleOptions {
        let mut options = DisassembleOptions::new(&self.output);
        options.roots = self.root_selectors();
        options.include_descendants = self.descendants;
        options.strip_unsupported = self.strip_signatures;
        options.allow_existing_output = self.force;
        options.jobs = self.jobs;
        options
    }
}

/// Execute the `disassemble` command.
pub fn execute(args: DisassembleArgs, color_flag: &str, quiet: bool) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag).quiet(quiet);

    let store = GitStore::open(&args.repo)
        .with_context(|| format!("{} is not a git repository", args.repo.display()))?;
    out.status(
        emoji(&out, "📦", "[READ]"),
        format!("Disassembling {}", args.repo.display()),
    );

    let report = disassemble::run(&store, &args.to_options())?;

    out.status(
        emoji(&out, "✅", "[OK]"),
        format!(
            "Wrote {} and {} to {}",
            count(report.commits, "commit"),
            count(report.refs, "ref"),
            args.output.display()
        ),
    );
    if !report.stripped.is_empty() {
        out.detail(format!(
            "{} Signatures dropped from {}; assembling will give them new ids",
            emoji(&out, "⚠️", "[WARN]"),
            count(report.stripped.len(), "commit")
        ));
    }
    if !report.dropped_markers.is_empty() {
        out.detail(format!(
            "{} Extra headers not exported from {}",
            emoji(&out, "⚠️", "[WARN]"),
            count(report.dropped_markers.len(), "commit")
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> DisassembleArgs {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: DisassembleArgs,
        }

        let mut argv = vec!["histdir", "repo", "out"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).args
    }

    #[test]
    fn test_no_selector_leaves_roots_empty() {
        let args = args(&[]);
        assert!(args.root_selectors().is_empty());
        assert_eq!(args.to_options().effective_roots(), vec![RootSelector::AllHeads]);
    }

    #[test]
    fn test_selectors_in_flag_order() {
        let args = args(&["--add", "main", "--add-tags", "--add", "abcd1234", "--all"]);
        assert_eq!(
            args.root_selectors(),
            vec![
                RootSelector::AllCommits,
                RootSelector::AllTags,
                RootSelector::Name("main".into()),
                RootSelector::Name("abcd1234".into()),
            ]
        );
    }

    #[test]
    fn test_options_carry_flags() {
        let options = args(&["--descendants", "--strip-signatures", "--force", "--jobs", "3"])
            .to_options();
        assert!(options.include_descendants);
        assert!(options.strip_unsupported);
        assert!(options.allow_existing_output);
        assert_eq!(options.jobs, 3);
        assert_eq!(options.output, PathBuf::from("out"));
    }

    #[test]
    fn test_missing_repository_is_reported() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut args = args(&[]);
        args.repo = temp.path().join("missing");
        args.output = temp.path().join("out");
        let error = execute(args, "never", true).unwrap_err();
        assert!(error.to_string().contains("is not a git repository"));
    }
}
