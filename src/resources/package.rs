//! Package repositories and package installs.
//!
//! A package counts as up to date when the installed version matches;
//! install options only take effect on (re)installation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PackageDecl, PackageRepoDecl};
use crate::model::{DesiredState, NoMembers, ResourceKind, ResourceRef, ResourceState};

use super::KindSpec;

/// Package repository kind.
#[derive(Debug, Clone, Copy)]
pub struct PackageRepo;

/// Package kind.
#[derive(Debug, Clone, Copy)]
pub struct Package;

/// A registered package repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSource {
    /// Repository URL.
    pub url: String,
    /// Position in the repository list.
    pub index: u32,
}

/// An installed package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRelease {
    /// Package name.
    pub name: String,
    /// Installed version.
    pub version: String,
    /// Install options.
    #[serde(default)]
    pub options: Value,
}

/// Returns the service identifier of a package declaration.
#[must_use]
pub fn app_id(decl: &PackageDecl) -> String {
    decl.app_id.clone().unwrap_or_else(|| decl.name.clone())
}

impl KindSpec for PackageRepo {
    type Payload = RepoSource;
    type Member = NoMembers;
    type Decl = PackageRepoDecl;

    const KIND: ResourceKind = ResourceKind::PackageRepo;

    fn resource_ref(decl: &PackageRepoDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, decl.name.clone())
    }

    fn desired(decl: &PackageRepoDecl) -> DesiredState<RepoSource, NoMembers> {
        if decl.state.is_present() {
            ResourceState::Present(RepoSource {
                url: decl.url.clone(),
                index: decl.index,
            })
        } else {
            ResourceState::Absent
        }
    }
}

impl KindSpec for Package {
    type Payload = PackageRelease;
    type Member = NoMembers;
    type Decl = PackageDecl;

    const KIND: ResourceKind = ResourceKind::Package;

    fn resource_ref(decl: &PackageDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, app_id(decl))
    }

    fn desired(decl: &PackageDecl) -> DesiredState<PackageRelease, NoMembers> {
        if decl.state.is_present() {
            ResourceState::Present(PackageRelease {
                name: decl.name.clone(),
                version: decl.version.clone().unwrap_or_default(),
                options: decl.options.clone(),
            })
        } else {
            ResourceState::Absent
        }
    }

    fn payload_eq(desired: &PackageRelease, observed: &PackageRelease) -> bool {
        desired.name == observed.name && desired.version == observed.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Presence;
    use serde_json::json;

    fn decl(app_id: Option<&str>) -> PackageDecl {
        PackageDecl {
            name: "kafka".to_string(),
            version: Some("2.3.0".to_string()),
            app_id: app_id.map(ToString::to_string),
            options: json!({"brokers": {"count": 3}}),
            state: Presence::Present,
        }
    }

    #[test]
    fn test_app_id_defaults_to_name() {
        assert_eq!(Package::resource_ref(&decl(None)).to_string(), "package:kafka");
        assert_eq!(
            Package::resource_ref(&decl(Some("kafka-prod"))).to_string(),
            "package:kafka-prod"
        );
    }

    #[test]
    fn test_only_version_is_compared() {
        let installed = PackageRelease {
            name: "kafka".to_string(),
            version: "2.3.0".to_string(),
            options: json!({}),
        };
        let wanted = Package::desired(&decl(None));
        let wanted = wanted.payload().expect("present");

        assert!(Package::payload_eq(wanted, &installed));

        let upgrade = PackageRelease {
            version: "2.4.0".to_string(),
            ..wanted.clone()
        };
        assert!(!Package::payload_eq(&upgrade, &installed));
    }

    #[test]
    fn test_repo_index_change_is_detected() {
        let repo = PackageRepoDecl {
            name: "universe".to_string(),
            url: "https://universe.example/repo".to_string(),
            index: 1,
            state: Presence::Present,
        };
        let desired = PackageRepo::desired(&repo);
        let observed = RepoSource {
            url: repo.url.clone(),
            index: 0,
        };

        assert!(!PackageRepo::payload_eq(desired.payload().expect("present"), &observed));
    }
}
