//! Manifest parser for loading manifest files.
//!
//! This module handles loading manifests from YAML files and applying
//! environment variable overrides, with proper precedence and error
//! handling.

use crate::error::{ConfigError, ConvergeError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::spec::Manifest;

/// Environment variable overriding `cluster.name`.
pub const ENV_CLUSTER_NAME: &str = "DCOS_CONVERGE_CLUSTER_NAME";
/// Environment variable overriding `cluster.url`.
pub const ENV_CLUSTER_URL: &str = "DCOS_CONVERGE_CLUSTER_URL";
/// Environment variable overriding `defaults.dry_run`.
pub const ENV_DRY_RUN: &str = "DCOS_CONVERGE_DRY_RUN";

/// Parser for loading manifests.
#[derive(Debug, Default)]
pub struct ManifestParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ManifestParser {
    /// Creates a new manifest parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        info!("Loading manifest from: {}", path.display());

        if !path.exists() {
            return Err(ConvergeError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvergeError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<Manifest> {
        debug!("Parsing YAML manifest");

        let manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            ConvergeError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed manifest for cluster {} with {} resource(s)",
            manifest.cluster.name,
            manifest.resources.len()
        );
        Ok(manifest)
    }

    /// Loads a manifest with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let mut manifest = self.load_file(path)?;
        Self::apply_overrides(&mut manifest, |name| std::env::var(name).ok());
        Ok(manifest)
    }

    /// Applies overrides read through `lookup` to the manifest.
    pub fn apply_overrides(manifest: &mut Manifest, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup(ENV_CLUSTER_NAME) {
            debug!("Overriding cluster.name from environment");
            manifest.cluster.name = name;
        }

        if let Some(url) = lookup(ENV_CLUSTER_URL) {
            debug!("Overriding cluster.url from environment");
            manifest.cluster.url = Some(url);
        }

        if let Some(raw) = lookup(ENV_DRY_RUN) {
            match parse_flag(&raw) {
                Some(dry_run) => {
                    debug!("Overriding defaults.dry_run from environment");
                    manifest.defaults.dry_run = dry_run;
                }
                None => warn!("Ignoring {ENV_DRY_RUN}={raw}: expected true or false"),
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConvergeError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Default manifest file names to search for.
pub const DEFAULT_MANIFEST_FILES: &[&str] = &["converge.yaml", "converge.yml"];

/// Finds the manifest file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no manifest file is found.
pub fn find_manifest_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_MANIFEST_FILES {
            let manifest_path = current.join(filename);
            if manifest_path.exists() {
                info!("Found manifest file: {}", manifest_path.display());
                return Ok(manifest_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConvergeError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_MANIFEST_FILES[0]),
    }))
}
