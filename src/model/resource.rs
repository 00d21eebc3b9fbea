//! Resource identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::poller::RetryPolicy;

/// The kinds of resource the engine knows how to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Marathon application.
    App,
    /// Marathon pod.
    Pod,
    /// Marathon group.
    Group,
    /// Secret in a secret store.
    Secret,
    /// IAM user; members are group memberships.
    IamUser,
    /// IAM group; members are permissions.
    IamGroup,
    /// IAM resource identifier.
    IamResource,
    /// Resource quota for a role.
    Quota,
    /// Package repository.
    PackageRepo,
    /// Installed package.
    Package,
}

impl ResourceKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::App,
        Self::Pod,
        Self::Group,
        Self::Secret,
        Self::IamUser,
        Self::IamGroup,
        Self::IamResource,
        Self::Quota,
        Self::PackageRepo,
        Self::Package,
    ];

    /// Returns the `snake_case` name used in manifests and snapshots.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Pod => "pod",
            Self::Group => "group",
            Self::Secret => "secret",
            Self::IamUser => "iam_user",
            Self::IamGroup => "iam_group",
            Self::IamResource => "iam_resource",
            Self::Quota => "quota",
            Self::PackageRepo => "package_repo",
            Self::Package => "package",
        }
    }

    /// Returns true if resources of this kind carry a member set.
    #[must_use]
    pub const fn has_members(self) -> bool {
        matches!(self, Self::IamUser | Self::IamGroup)
    }

    /// Returns the retry policy used when the manifest does not override it.
    ///
    /// Workloads get one extra backoff round since the scheduler has to
    /// place tasks before they become visible.
    #[must_use]
    pub const fn default_policy(self) -> RetryPolicy {
        match self {
            Self::App | Self::Pod | Self::Group => RetryPolicy::workload(),
            _ => RetryPolicy::fast(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind: {s}"))
    }
}

/// Identity of one resource: its kind plus an identifier unique within it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Identifier within the kind's namespace.
    pub id: String,
}

impl ResourceRef {
    /// Creates a new resource reference.
    #[must_use]
    pub fn new(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
