//! # snapseek CLI
//!
//! Command-line interface for semantic image search.
//!
//! This binary provides human-friendly access to `snapseek-core` functionality.
//! Run `snapseek --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
