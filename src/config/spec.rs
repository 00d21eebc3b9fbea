//! Manifest specification types.
//!
//! This module defines the structs that map to the `converge.yaml` file. A
//! manifest names one cluster and declares the resources that should (or
//! should not) exist on it.

use serde::{Deserialize, Serialize};

use crate::model::{ClusterContext, ResourceKind, ResourceRef};
use crate::resources::KindSpec;
use crate::resources::iam::{self, Permission};
use crate::resources::marathon::{App, Group, Pod};
use crate::resources::package::{Package, PackageRepo};
use crate::resources::quota::Quota;
use crate::resources::secret::Secret;

/// The root structure of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Cluster the manifest applies to.
    pub cluster: ClusterContext,
    /// Defaults applied to every resource.
    #[serde(default)]
    pub defaults: Defaults,
    /// Declared resources, reconciled in order.
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
}

/// Defaults applied to every resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Defaults {
    /// Overrides the per-kind number of backoff rounds.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Overrides the per-kind initial backoff delay, in milliseconds.
    #[serde(default)]
    pub base_delay_ms: Option<u64>,
    /// Compute plans without applying them.
    #[serde(default)]
    pub dry_run: bool,
}

/// Whether a declared resource should exist.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// The resource should exist.
    #[default]
    Present,
    /// The resource should not exist.
    Absent,
}

impl Presence {
    /// Returns true if the resource should exist.
    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

/// One declared resource, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDecl {
    /// Marathon application.
    App(MarathonDecl),
    /// Marathon pod.
    Pod(MarathonDecl),
    /// Marathon group.
    Group(MarathonDecl),
    /// Secret.
    Secret(SecretDecl),
    /// IAM user.
    IamUser(IamUserDecl),
    /// IAM group.
    IamGroup(IamGroupDecl),
    /// IAM resource.
    IamResource(IamResourceDecl),
    /// Role quota.
    Quota(QuotaDecl),
    /// Package repository.
    PackageRepo(PackageRepoDecl),
    /// Package install.
    Package(PackageDecl),
}

impl ResourceDecl {
    /// Returns the kind of the declared resource.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::App(_) => ResourceKind::App,
            Self::Pod(_) => ResourceKind::Pod,
            Self::Group(_) => ResourceKind::Group,
            Self::Secret(_) => ResourceKind::Secret,
            Self::IamUser(_) => ResourceKind::IamUser,
            Self::IamGroup(_) => ResourceKind::IamGroup,
            Self::IamResource(_) => ResourceKind::IamResource,
            Self::Quota(_) => ResourceKind::Quota,
            Self::PackageRepo(_) => ResourceKind::PackageRepo,
            Self::Package(_) => ResourceKind::Package,
        }
    }

    /// Returns the raw identifier as written in the manifest.
    #[must_use]
    pub fn raw_id(&self) -> &str {
        match self {
            Self::App(decl) | Self::Pod(decl) | Self::Group(decl) => &decl.id,
            Self::Secret(decl) => &decl.path,
            Self::IamUser(decl) => &decl.uid,
            Self::IamGroup(decl) => &decl.gid,
            Self::IamResource(decl) => &decl.rid,
            Self::Quota(decl) => &decl.role,
            Self::PackageRepo(decl) => &decl.name,
            Self::Package(decl) => &decl.name,
        }
    }

    /// Returns the reference the resource is reconciled under.
    #[must_use]
    pub fn resource_ref(&self) -> ResourceRef {
        match self {
            Self::App(decl) => App::resource_ref(decl),
            Self::Pod(decl) => Pod::resource_ref(decl),
            Self::Group(decl) => Group::resource_ref(decl),
            Self::Secret(decl) => Secret::resource_ref(decl),
            Self::IamUser(decl) => iam::IamUser::resource_ref(decl),
            Self::IamGroup(decl) => iam::IamGroup::resource_ref(decl),
            Self::IamResource(decl) => iam::IamResource::resource_ref(decl),
            Self::Quota(decl) => Quota::resource_ref(decl),
            Self::PackageRepo(decl) => PackageRepo::resource_ref(decl),
            Self::Package(decl) => Package::resource_ref(decl),
        }
    }

    /// Returns whether the resource should exist.
    #[must_use]
    pub const fn presence(&self) -> Presence {
        match self {
            Self::App(decl) | Self::Pod(decl) | Self::Group(decl) => decl.state,
            Self::Secret(decl) => decl.state,
            Self::IamUser(decl) => decl.state,
            Self::IamGroup(decl) => decl.state,
            Self::IamResource(decl) => decl.state,
            Self::Quota(decl) => decl.state,
            Self::PackageRepo(decl) => decl.state,
            Self::Package(decl) => decl.state,
        }
    }
}

/// A Marathon app, pod or group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarathonDecl {
    /// Marathon identifier; normalised to a single leading slash.
    pub id: String,
    /// JSON definition sent to Marathon; `id` is injected.
    #[serde(default)]
    pub definition: serde_json::Value,
    /// Whether the resource should exist.
    #[serde(default)]
    pub state: Presence,
}

/// A secret in a secret store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecretDecl {
    /// Path of the secret within its store.
    pub path: String,
    /// Secret store name.
    #[serde(default = "default_store")]
    pub store: String,
    /// Secret value.
    #[serde(default)]
    pub value: Option<String>,
    /// Whether the secret should exist.
    #[serde(default)]
    pub state: Presence,
}

/// An IAM user and its group memberships.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IamUserDecl {
    /// User identifier.
    pub uid: String,
    /// Description shown in the IAM service.
    #[serde(default)]
    pub description: Option<String>,
    /// Groups the user must belong to, exactly.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Whether the user should exist.
    #[serde(default)]
    pub state: Presence,
}

/// An IAM group and its permissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IamGroupDecl {
    /// Group identifier.
    pub gid: String,
    /// Description shown in the IAM service.
    #[serde(default)]
    pub description: Option<String>,
    /// Permissions the group must hold, exactly.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Whether the group should exist.
    #[serde(default)]
    pub state: Presence,
}

/// An IAM resource identifier that permissions can refer to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IamResourceDecl {
    /// Resource identifier, e.g. `dcos:adminrouter:service:marathon`.
    pub rid: String,
    /// Description shown in the IAM service.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the resource should exist.
    #[serde(default)]
    pub state: Presence,
}

/// Resource limits for a role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuotaDecl {
    /// Role the quota applies to.
    pub role: String,
    /// CPU shares.
    #[serde(default)]
    pub cpu: Option<f64>,
    /// Memory in MiB.
    #[serde(default)]
    pub mem: Option<f64>,
    /// Disk in MiB.
    #[serde(default)]
    pub disk: Option<f64>,
    /// GPU count.
    #[serde(default)]
    pub gpu: Option<f64>,
    /// Whether the quota should exist.
    #[serde(default)]
    pub state: Presence,
}

/// A package repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageRepoDecl {
    /// Repository name.
    pub name: String,
    /// Repository URL.
    pub url: String,
    /// Position in the repository list.
    #[serde(default)]
    pub index: u32,
    /// Whether the repository should be registered.
    #[serde(default)]
    pub state: Presence,
}

/// An installed package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageDecl {
    /// Package name.
    pub name: String,
    /// Package version; required when present.
    #[serde(default)]
    pub version: Option<String>,
    /// Service identifier; defaults to the package name.
    #[serde(default)]
    pub app_id: Option<String>,
    /// Install options.
    #[serde(default)]
    pub options: serde_json::Value,
    /// Whether the package should be installed.
    #[serde(default)]
    pub state: Presence,
}

fn default_store() -> String {
    String::from("default")
}
