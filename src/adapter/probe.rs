//! Read side of a control plane.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{ClusterContext, Member, ObservedState, Payload, ResourceRef};

/// Reads the observable state of one resource.
#[async_trait]
pub trait StateProbe<P: Payload, M: Member>: Send + Sync {
    /// Observes the current state of `resource`.
    ///
    /// A missing resource is `Ok(ResourceState::Absent)`, never an error.
    ///
    /// # Errors
    ///
    /// Returns an unreachable error if the control plane cannot be read.
    async fn observe(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
    ) -> Result<ObservedState<P, M>>;

    /// Returns the members of `members` whose referenced resource does not
    /// exist. By default every member resolves.
    ///
    /// # Errors
    ///
    /// Returns an unreachable error if the control plane cannot be read.
    async fn unresolved_members(
        &self,
        _ctx: &ClusterContext,
        _resource: &ResourceRef,
        _members: &BTreeSet<M>,
    ) -> Result<BTreeSet<M>> {
        Ok(BTreeSet::new())
    }
}
