//! Error types for the reconciliation engine and its hosts.
//!
//! Absence of a resource is never an error: it is modelled as
//! [`ResourceState::Absent`](crate::model::ResourceState). Errors are reserved
//! for an unreadable control plane, unresolved references, rejected
//! mutations and configuration problems.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::ResourceRef;

/// The main error type for the reconciliation engine.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// The control plane could not be read.
    #[error("Control plane unreachable while observing {resource}: {message}")]
    Unreachable {
        /// Resource being observed.
        resource: ResourceRef,
        /// Description of the failure.
        message: String,
    },

    /// Desired members reference resources that do not exist.
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// A mutation was rejected by the control plane.
    #[error(transparent)]
    Mutation(#[from] MutationError),

    /// The resource did not reach its desired state within the retry budget.
    #[error("{resource} did not converge after {attempts} attempts")]
    ConvergenceTimeout {
        /// Resource that did not converge.
        resource: ResourceRef,
        /// Number of backoff rounds spent.
        attempts: u32,
    },

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Cluster snapshot errors.
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Desired members that do not resolve in the wider namespace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot grant members of {resource} that do not exist: {}", .missing.join(", "))]
pub struct ReferenceError {
    /// Resource whose members were checked.
    pub resource: ResourceRef,
    /// Display form of every unresolved member.
    pub missing: Vec<String>,
}

/// Classification of a rejected mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationErrorKind {
    /// The resource exists and cannot be created again.
    AlreadyExists,
    /// The resource to modify does not exist.
    NotFound,
    /// The control plane refused the change.
    Rejected,
}

impl fmt::Display for MutationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "already exists"),
            Self::NotFound => write!(f, "not found"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A mutation the control plane refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{action} on {resource} failed ({kind}): {message}")]
pub struct MutationError {
    /// Resource being mutated.
    pub resource: ResourceRef,
    /// Name of the action that failed.
    pub action: &'static str,
    /// Failure classification.
    pub kind: MutationErrorKind,
    /// Description from the control plane.
    pub message: String,
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Manifest file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest could not be parsed.
    #[error("Failed to parse manifest: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Manifest validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A retry policy parameter is out of range.
    #[error("Invalid retry policy: {message}")]
    InvalidPolicy {
        /// Description of the invalid parameter.
        message: String,
    },
}

/// Cluster snapshot errors.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The snapshot file could not be decoded.
    #[error("Snapshot at {path} is corrupted: {message}")]
    Corrupted {
        /// Path to the snapshot file.
        path: PathBuf,
        /// Description of the corruption.
        message: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// No location is available for the snapshot file.
    #[error("Cannot determine cluster file location: {message}")]
    NoLocation {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, ConvergeError>;

impl ConvergeError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates an unreachable error for the given resource.
    #[must_use]
    pub fn unreachable(resource: &ResourceRef, message: impl Into<String>) -> Self {
        Self::Unreachable {
            resource: resource.clone(),
            message: message.into(),
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// The engine never retries on its own; this tells a host whether a
    /// later re-run could succeed without changing the manifest.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::ConvergenceTimeout { .. }
        )
    }
}

impl MutationError {
    /// Creates a mutation error.
    #[must_use]
    pub fn new(
        resource: &ResourceRef,
        action: &'static str,
        kind: MutationErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resource: resource.clone(),
            action,
            kind,
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an invalid policy error.
    #[must_use]
    pub fn invalid_policy(message: impl Into<String>) -> Self {
        Self::InvalidPolicy {
            message: message.into(),
        }
    }
}

impl ClusterError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}
