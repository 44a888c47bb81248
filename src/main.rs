//! # histdir CLI
//!
//! This is the binary entry point for the `histdir` command-line tool.
//!
//! It parses arguments with `clap`, sets up logging and hands off to the
//! subcommand. The work itself lives in the `histdir` library crate; the
//! binary only turns flags into options and reports the outcome.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
