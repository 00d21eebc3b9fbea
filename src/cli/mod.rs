//! CLI module for the dcos-converge tool.
//!
//! This module provides the command-line interface and the formatting of
//! run reports, snapshots and validation results.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
