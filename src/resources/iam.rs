//! IAM users, groups and resources.
//!
//! Users and groups carry member sets: a user's member set is the groups
//! it belongs to, a group's is the permissions it holds. Both must point at
//! things that already exist, which is checked before any mutation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{IamGroupDecl, IamResourceDecl, IamUserDecl, Presence};
use crate::model::{DesiredState, Member, NoMembers, ResourceKind, ResourceRef, ResourceState};

use super::KindSpec;

const DEFAULT_DESCRIPTION: &str = "managed by dcos-converge";

/// IAM user kind.
#[derive(Debug, Clone, Copy)]
pub struct IamUser;

/// IAM group kind.
#[derive(Debug, Clone, Copy)]
pub struct IamGroup;

/// IAM resource kind.
#[derive(Debug, Clone, Copy)]
pub struct IamResource;

/// Descriptive fields shared by every IAM object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamProfile {
    /// Human readable description.
    pub description: String,
}

impl IamProfile {
    fn from_description(description: Option<&String>) -> Self {
        Self {
            description: description.map_or_else(|| DEFAULT_DESCRIPTION.to_string(), Clone::clone),
        }
    }
}

/// An action granted on an IAM resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// IAM resource identifier.
    pub rid: String,
    /// Action allowed on it, e.g. `read` or `full`.
    pub action: String,
}

impl Permission {
    /// Creates a permission.
    #[must_use]
    pub fn new(rid: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            rid: rid.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.action, self.rid)
    }
}

impl Member for Permission {
    fn referenced(&self) -> Option<ResourceRef> {
        Some(ResourceRef::new(ResourceKind::IamResource, self.rid.clone()))
    }
}

/// Membership of a user in a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Member for GroupId {
    fn referenced(&self) -> Option<ResourceRef> {
        Some(ResourceRef::new(ResourceKind::IamGroup, self.0.clone()))
    }
}

fn with_members<M: Ord>(
    state: Presence,
    profile: IamProfile,
    members: impl IntoIterator<Item = M>,
) -> DesiredState<IamProfile, M> {
    if state.is_present() {
        ResourceState::with_members(profile, members)
    } else {
        ResourceState::Absent
    }
}

impl KindSpec for IamUser {
    type Payload = IamProfile;
    type Member = GroupId;
    type Decl = IamUserDecl;

    const KIND: ResourceKind = ResourceKind::IamUser;

    fn resource_ref(decl: &IamUserDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, decl.uid.clone())
    }

    fn desired(decl: &IamUserDecl) -> DesiredState<IamProfile, GroupId> {
        with_members(
            decl.state,
            IamProfile::from_description(decl.description.as_ref()),
            decl.groups.iter().cloned().map(GroupId),
        )
    }
}

impl KindSpec for IamGroup {
    type Payload = IamProfile;
    type Member = Permission;
    type Decl = IamGroupDecl;

    const KIND: ResourceKind = ResourceKind::IamGroup;

    fn resource_ref(decl: &IamGroupDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, decl.gid.clone())
    }

    fn desired(decl: &IamGroupDecl) -> DesiredState<IamProfile, Permission> {
        with_members(
            decl.state,
            IamProfile::from_description(decl.description.as_ref()),
            decl.permissions.iter().cloned(),
        )
    }
}

impl KindSpec for IamResource {
    type Payload = IamProfile;
    type Member = NoMembers;
    type Decl = IamResourceDecl;

    const KIND: ResourceKind = ResourceKind::IamResource;

    fn resource_ref(decl: &IamResourceDecl) -> ResourceRef {
        ResourceRef::new(Self::KIND, decl.rid.clone())
    }

    fn desired(decl: &IamResourceDecl) -> DesiredState<IamProfile, NoMembers> {
        if decl.state.is_present() {
            ResourceState::Present(IamProfile::from_description(decl.description.as_ref()))
        } else {
            ResourceState::Absent
        }
    }

    // Presence only: descriptions are set at creation and never updated.
    fn payload_eq(_desired: &IamProfile, _observed: &IamProfile) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_decl(permissions: Vec<Permission>) -> IamGroupDecl {
        IamGroupDecl {
            gid: "ops".to_string(),
            description: None,
            permissions,
            state: Presence::Present,
        }
    }

    #[test]
    fn test_permission_references_iam_resource() {
        let permission = Permission::new("dcos:adminrouter:service:marathon", "full");

        assert_eq!(
            permission.referenced(),
            Some(ResourceRef::new(
                ResourceKind::IamResource,
                "dcos:adminrouter:service:marathon"
            ))
        );
        assert_eq!(permission.to_string(), "full on dcos:adminrouter:service:marathon");
    }

    #[test]
    fn test_group_membership_references_group() {
        assert_eq!(
            GroupId("ops".to_string()).referenced(),
            Some(ResourceRef::new(ResourceKind::IamGroup, "ops"))
        );
    }

    #[test]
    fn test_group_permissions_collapse_duplicates() {
        let desired = IamGroup::desired(&group_decl(vec![
            Permission::new("r1", "read"),
            Permission::new("r1", "read"),
            Permission::new("r2", "write"),
        ]));

        assert_eq!(desired.members().map(std::collections::BTreeSet::len), Some(2));
        assert_eq!(
            desired.payload().map(|profile| profile.description.as_str()),
            Some(DEFAULT_DESCRIPTION)
        );
    }

    #[test]
    fn test_user_groups_become_members() {
        let decl = IamUserDecl {
            uid: "alice".to_string(),
            description: Some("Alice".to_string()),
            groups: vec!["ops".to_string(), "dev".to_string()],
            state: Presence::Present,
        };

        let desired = IamUser::desired(&decl);
        let members: Vec<String> = desired
            .members()
            .expect("members")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(members, vec!["dev", "ops"]);
    }

    #[test]
    fn test_absent_group_has_no_members() {
        let mut decl = group_decl(vec![Permission::new("r1", "read")]);
        decl.state = Presence::Absent;
        assert!(IamGroup::desired(&decl).is_absent());
    }

    #[test]
    fn test_iam_resource_is_presence_only() {
        let a = IamProfile {
            description: "one".to_string(),
        };
        let b = IamProfile {
            description: "two".to_string(),
        };
        assert!(IamResource::payload_eq(&a, &b));
        assert!(!IamGroup::payload_eq(&a, &b));
    }
}
