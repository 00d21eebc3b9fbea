//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dcos-converge - Declarative reconciliation of DC/OS cluster resources.
#[derive(Parser, Debug)]
#[command(name = "dcos-converge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the manifest file.
    #[arg(short, long, global = true, env = "DCOS_CONVERGE_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Path to the cluster file (defaults to one per cluster name).
    #[arg(long, global = true, env = "DCOS_CONVERGE_CLUSTER_FILE")]
    pub cluster_file: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Validate the manifest.
    Validate,

    /// Show what apply would change, without changing anything.
    Plan,

    /// Reconcile the cluster towards the manifest.
    Apply {
        /// Compute the plan only.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the cluster snapshot.
    Show,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
