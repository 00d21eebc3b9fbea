//! dcos-converge CLI entrypoint.
//!
//! This is the main entrypoint for the dcos-converge command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use dcos_converge::cli::{Cli, Commands, OutputFormatter};
use dcos_converge::cluster::LocalCluster;
use dcos_converge::config::{
    Manifest, ManifestParser, ManifestValidator, ValidationResult, find_manifest_file,
};
use dcos_converge::error::Result;
use dcos_converge::runner::ManifestRunner;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose, cli.log_json);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_retryable() {
                eprintln!("This may succeed if run again.");
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// Logs go to stderr so that stdout only carries command output.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point. Returns false when a resource failed.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);
    let manifest_path = resolve_manifest_path(cli.manifest.as_ref())?;

    match cli.command {
        Commands::Validate => cmd_validate(&manifest_path, &formatter),
        Commands::Plan => {
            cmd_apply(&manifest_path, cli.cluster_file.as_ref(), true, &formatter).await
        }
        Commands::Apply { dry_run } => {
            cmd_apply(&manifest_path, cli.cluster_file.as_ref(), dry_run, &formatter).await
        }
        Commands::Show => cmd_show(&manifest_path, cli.cluster_file.as_ref(), &formatter).await,
    }
}

/// Validate the manifest.
fn cmd_validate(manifest_path: &Path, formatter: &OutputFormatter) -> Result<bool> {
    info!("Validating manifest: {}", manifest_path.display());

    let (manifest, result) = load_manifest(manifest_path)?;
    emit(&formatter.format_validation(&manifest, &result))?;

    Ok(true)
}

/// Reconcile the cluster, or only plan when `dry_run` is set.
async fn cmd_apply(
    manifest_path: &Path,
    cluster_file: Option<&PathBuf>,
    dry_run: bool,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let (manifest, _) = load_manifest(manifest_path)?;
    let cluster = open_cluster(&manifest, cluster_file).await?;

    let dry_run = dry_run || manifest.defaults.dry_run;
    let report = ManifestRunner::new(&manifest, &cluster)
        .with_dry_run(dry_run)
        .run()
        .await?;

    emit(&formatter.format_report(&report))?;
    Ok(!report.has_failures())
}

/// Show the cluster snapshot.
async fn cmd_show(
    manifest_path: &Path,
    cluster_file: Option<&PathBuf>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let (manifest, _) = load_manifest(manifest_path)?;
    let cluster = open_cluster(&manifest, cluster_file).await?;

    emit(&formatter.format_snapshot(&cluster.snapshot().await))?;
    Ok(true)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolves the manifest file path.
fn resolve_manifest_path(manifest_path: Option<&PathBuf>) -> Result<PathBuf> {
    manifest_path.map_or_else(|| find_manifest_file("."), |path| Ok(path.clone()))
}

/// Loads `.env`, the manifest and its environment overrides, then validates.
fn load_manifest(manifest_path: &Path) -> Result<(Manifest, ValidationResult)> {
    debug!("Loading manifest from: {}", manifest_path.display());

    let parser = ManifestParser::new()
        .with_base_path(manifest_path.parent().unwrap_or_else(|| Path::new(".")));
    parser.load_dotenv()?;

    let manifest = parser.load_with_env(manifest_path)?;
    let result = ManifestValidator::new().validate(&manifest)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }

    Ok((manifest, result))
}

/// Opens the cluster file named on the command line, or the default one.
async fn open_cluster(manifest: &Manifest, cluster_file: Option<&PathBuf>) -> Result<LocalCluster> {
    let path = match cluster_file {
        Some(path) => path.clone(),
        None => LocalCluster::default_path(&manifest.cluster.name)?,
    };
    debug!("Using cluster file: {}", path.display());

    LocalCluster::open(path, &manifest.cluster.name).await
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
