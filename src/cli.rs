//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// histdir - Edit git history as a directory tree
#[derive(Parser, Debug)]
#[command(name = "histdir")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the commits of a repository out as one directory per commit
    Disassemble(commands::disassemble::DisassembleArgs),

    /// Rebuild commits and refs from a disassembled directory tree
    Assemble(commands::assemble::AssembleArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Disassemble(args) => {
                commands::disassemble::execute(args, &self.color, self.quiet)
            }
            Commands::Assemble(args) => commands::assemble::execute(args, &self.color, self.quiet),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Send `log` records to stderr, filtered by `RUST_LOG` or else `level`.
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second initialization (e.g. in tests) keeps the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_defaults() {
        let cli = Cli::parse_from(["histdir", "assemble", "in", "repo"]);
        assert_eq!(cli.color, "auto");
        assert_eq!(cli.log_level, "warn");
        assert!(!cli.quiet);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "histdir",
            "disassemble",
            "repo",
            "out",
            "--quiet",
            "--log-level",
            "debug",
        ]);
        assert!(cli.quiet);
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Commands::Disassemble(_)));
    }
}
