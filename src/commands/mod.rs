//! # CLI Command Implementations
//!
//! One module per subcommand of the `histdir` command-line tool. Each holds
//! an `Args` struct derived with `clap` and an `execute` function that
//! builds the run options, calls into the `histdir` library and prints a
//! summary.

pub mod assemble;
pub mod completions;
pub mod disassemble;
