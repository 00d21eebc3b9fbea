//! Manifest validation.
//!
//! Catches problems that would otherwise surface halfway through a run:
//! duplicate declarations, empty identifiers, out-of-range policy values
//! and incomplete package or Marathon declarations.

use crate::error::{ConfigError, Result};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use super::spec::{Defaults, Manifest, ResourceDecl};
use crate::resources::marathon;
use crate::resources::KindSpec;
use crate::resources::quota::{Quota, QuotaLimits};

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any rule fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let result = self.check(manifest);

        if let Some(first_error) = result.errors.first() {
            return Err(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )
            .into());
        }

        debug!("Manifest validation passed");
        Ok(result)
    }

    /// Runs every rule and collects all errors and warnings.
    #[must_use]
    pub fn check(&self, manifest: &Manifest) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_cluster(manifest, &mut result);
        Self::validate_defaults(&manifest.defaults, &mut result);
        Self::validate_resources(&manifest.resources, &mut result);

        result
    }

    fn validate_cluster(manifest: &Manifest, result: &mut ValidationResult) {
        let name = &manifest.cluster.name;
        if name.trim().is_empty() {
            result.error("cluster.name", "Cluster name cannot be empty");
        } else if !is_valid_cluster_name(name) {
            result.error(
                "cluster.name",
                format!(
                    "Cluster name '{name}' is invalid. Must be alphanumeric with '-', '_' or '.'."
                ),
            );
        }

        if let Some(url) = &manifest.cluster.url
            && !is_http_url(url)
        {
            result.error("cluster.url", format!("Cluster URL '{url}' must be http(s)"));
        }
    }

    fn validate_defaults(defaults: &Defaults, result: &mut ValidationResult) {
        if defaults.max_attempts == Some(0) {
            result.error("defaults.max_attempts", "max_attempts must be positive");
        }
        if defaults.base_delay_ms == Some(0) {
            result.error("defaults.base_delay_ms", "base_delay_ms must be positive");
        }
    }

    fn validate_resources(resources: &[ResourceDecl], result: &mut ValidationResult) {
        if resources.is_empty() {
            result
                .warnings
                .push(String::from("Manifest declares no resources"));
            return;
        }

        let mut seen = HashSet::new();
        for (index, decl) in resources.iter().enumerate() {
            let field = format!("resources[{index}]");

            if decl.raw_id().trim_matches('/').trim().is_empty() {
                result.error(
                    &field,
                    format!("{} declaration has an empty identifier", decl.kind()),
                );
                continue;
            }

            let resource = decl.resource_ref();
            if !seen.insert(resource.clone()) {
                result.error(&field, format!("Duplicate resource declaration: {resource}"));
            }

            Self::validate_resource(decl, &field, result);
        }
    }

    fn validate_resource(decl: &ResourceDecl, field: &str, result: &mut ValidationResult) {
        let present = decl.presence().is_present();

        match decl {
            ResourceDecl::App(marathon) | ResourceDecl::Pod(marathon) | ResourceDecl::Group(marathon) => {
                if !marathon::has_object_definition(decl) {
                    result.error(
                        format!("{field}.definition"),
                        "Marathon definition must be a mapping",
                    );
                } else if let Some(id) = marathon.definition.get("id") {
                    match id.as_str() {
                        Some(id)
                            if marathon::normalize_id(id) == marathon::normalize_id(&marathon.id) => {}
                        Some(id) => result.error(
                            format!("{field}.definition.id"),
                            format!(
                                "Definition id '{id}' differs from declared id '{}'",
                                marathon.id
                            ),
                        ),
                        None => result.error(
                            format!("{field}.definition.id"),
                            "Definition id must be a string",
                        ),
                    }
                }
            }
            ResourceDecl::Secret(secret) => {
                if present && secret.value.is_none() {
                    result.warnings.push(format!(
                        "{field}: secret {} has no value; an empty value will be stored",
                        secret.path
                    ));
                }
            }
            ResourceDecl::IamUser(user) => {
                let unique: BTreeSet<&String> = user.groups.iter().collect();
                if unique.len() != user.groups.len() {
                    result
                        .warnings
                        .push(format!("{field}: user {} lists a group twice", user.uid));
                }
            }
            ResourceDecl::IamGroup(group) => {
                for (position, permission) in group.permissions.iter().enumerate() {
                    if permission.rid.trim().is_empty() || permission.action.trim().is_empty() {
                        result.error(
                            format!("{field}.permissions[{position}]"),
                            "Permission needs both rid and action",
                        );
                    }
                }
            }
            ResourceDecl::Quota(quota) => {
                let limits = [quota.cpu, quota.mem, quota.disk, quota.gpu];
                if limits.iter().flatten().any(|limit| *limit < 0.0) {
                    result.error(field, format!("Quota for {} has a negative limit", quota.role));
                } else if Quota::desired(quota)
                    .payload()
                    .is_some_and(QuotaLimits::is_unlimited)
                {
                    result
                        .warnings
                        .push(format!("{field}: quota for {} sets no limits", quota.role));
                }
            }
            ResourceDecl::PackageRepo(repo) => {
                if present && !is_http_url(&repo.url) {
                    result.error(
                        format!("{field}.url"),
                        format!("Repository URL '{}' must be http(s)", repo.url),
                    );
                }
            }
            ResourceDecl::Package(package) => {
                if present && package.version.as_ref().is_none_or(|v| v.trim().is_empty()) {
                    result.error(
                        format!("{field}.version"),
                        format!("Package {} needs a version when present", package.name),
                    );
                }
            }
            ResourceDecl::IamResource(_) => {}
        }
    }
}

/// Checks if a cluster name is usable as a file name.
fn is_valid_cluster_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.')
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
