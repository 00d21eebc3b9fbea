//! Desired and observed resource state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::ResourceRef;

/// Bound for resource payloads.
pub trait Payload: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// Bound for members of a resource's member set.
pub trait Member: Ord + Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// The resource this member points at, if it must exist before the
    /// member can be granted.
    fn referenced(&self) -> Option<ResourceRef> {
        None
    }
}

impl Member for String {}

/// Member type for kinds that carry no member set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NoMembers {}

impl fmt::Display for NoMembers {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl Member for NoMembers {}

/// State of one resource, either declared or observed.
///
/// Member sets are ordered sets: duplicates collapse and iteration order is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState<P, M> {
    /// The resource does not exist.
    Absent,
    /// The resource exists; its members, if any, are not considered.
    Present(P),
    /// The resource exists with exactly this member set.
    PresentWithMembers(P, BTreeSet<M>),
}

/// State declared by the caller.
pub type DesiredState<P, M> = ResourceState<P, M>;

/// State read back from the control plane.
pub type ObservedState<P, M> = ResourceState<P, M>;

impl<P, M> ResourceState<P, M> {
    /// Returns true if the resource does not exist.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns the payload, if present.
    #[must_use]
    pub const fn payload(&self) -> Option<&P> {
        match self {
            Self::Absent => None,
            Self::Present(payload) | Self::PresentWithMembers(payload, _) => Some(payload),
        }
    }

    /// Returns the member set, if this state carries one.
    #[must_use]
    pub const fn members(&self) -> Option<&BTreeSet<M>> {
        match self {
            Self::PresentWithMembers(_, members) => Some(members),
            _ => None,
        }
    }

    /// Short label for logs and reports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Present(_) => "present",
            Self::PresentWithMembers(..) => "present with members",
        }
    }
}

impl<P, M: Ord> ResourceState<P, M> {
    /// Creates a present state carrying the given members.
    #[must_use]
    pub fn with_members(payload: P, members: impl IntoIterator<Item = M>) -> Self {
        Self::PresentWithMembers(payload, members.into_iter().collect())
    }
}
