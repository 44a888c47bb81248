//! # Assemble Command Implementation
//!
//! Implements `histdir assemble <INPUT> <REPO>`: reads a disassembled tree
//! and writes its commits and refs into REPO. REPO is created with
//! `git init` when it does not exist yet, unless `--no-init` is given.
//!
//! Existing refs with the same names are moved. Nothing else in REPO is
//! changed, and nothing at all is written if the tree fails validation.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use histdir::assemble;
use histdir::context::AssembleOptions;
use histdir::git::GitStore;
use histdir::output::{count, emoji, OutputConfig};

/// Rebuild commits and refs from a disassembled directory tree
#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Disassembled tree to read
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Repository to write into
    #[arg(value_name = "REPO")]
    pub repo: PathBuf,

    /// Fail instead of creating REPO when it is not a repository
    #[arg(long)]
    pub no_init: bool,
}

fn open_target(args: &AssembleArgs) -> Result<GitStore> {
    if args.no_init {
        GitStore::open(&args.repo)
            .with_context(|| format!("{} is not a git repository", args.repo.display()))
    } else {
        GitStore::open_or_init(&args.repo)
            .with_context(|| format!("Could not open or create {}", args.repo.display()))
    }
}

/// Execute the `assemble` command.
pub fn execute(args: AssembleArgs, color_flag: &str, quiet: bool) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag).quiet(quiet);

    if !args.input.is_dir() {
        anyhow::bail!("Input directory not found: {}", args.input.display());
    }

    let store = open_target(&args)?;
    out.status(
        emoji(&out, "🔨", "[BUILD]"),
        format!(
            "Assembling {} into {}",
            args.input.display(),
            store.git_dir().display()
        ),
    );

    let report = assemble::run(&store, &AssembleOptions::new(&args.input))?;

    out.status(
        emoji(&out, "✅", "[OK]"),
        format!(
            "Wrote {} and updated {}",
            count(report.commits.len(), "commit"),
            count(report.refs.len(), "ref")
        ),
    );
    for (name, id) in &report.refs {
        out.detail(format!("{} -> {}", name, id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_input_fails_before_touching_repo() {
        let temp = TempDir::new().unwrap();
        let repo = temp.path().join("repo");
        let args = AssembleArgs {
            input: temp.path().join("missing"),
            repo: repo.clone(),
            no_init: false,
        };

        let error = execute(args, "never", true).unwrap_err();
        assert!(error.to_string().contains("Input directory not found"));
        assert!(!repo.exists());
    }

    #[test]
    fn test_no_init_requires_existing_repo() {
        let temp = TempDir::new().unwrap();
        let args = AssembleArgs {
            input: temp.path().to_path_buf(),
            repo: temp.path().join("repo"),
            no_init: true,
        };

        let error = execute(args, "never", true).unwrap_err();
        assert!(error.to_string().contains("is not a git repository"));
    }
}
