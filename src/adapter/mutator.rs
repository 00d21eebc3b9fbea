//! Write side of a control plane.

use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::info;

use crate::error::Result;
use crate::model::{ClusterContext, Member, Payload, ResourceRef};
use crate::planner::Action;

/// Applies single mutations to one resource.
///
/// Every method must be safe to replay: deleting an absent resource and
/// re-granting or re-revoking members succeed. Side effects stay confined
/// to the named resource.
#[async_trait]
pub trait Mutator<P: Payload, M: Member>: Send + Sync {
    /// Creates the resource.
    ///
    /// # Errors
    ///
    /// Returns a mutation error with kind `AlreadyExists` if a conflicting
    /// resource exists, or `Rejected` if the control plane refuses it.
    async fn create(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &P,
    ) -> Result<()>;

    /// Replaces the resource's payload.
    ///
    /// # Errors
    ///
    /// Returns a mutation error if the resource is missing or the change is
    /// refused.
    async fn update(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &P,
    ) -> Result<()>;

    /// Deletes the resource. Succeeds if it is already gone.
    ///
    /// # Errors
    ///
    /// Returns a mutation error if the control plane refuses the deletion.
    async fn delete(&self, ctx: &ClusterContext, resource: &ResourceRef) -> Result<()>;

    /// Grants members to the resource.
    ///
    /// # Errors
    ///
    /// Returns a mutation error if the resource is missing or the grant is
    /// refused.
    async fn add_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<()>;

    /// Revokes members from the resource.
    ///
    /// # Errors
    ///
    /// Returns a mutation error if the resource is missing or the revocation
    /// is refused.
    async fn remove_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<()>;
}

/// Dispatches one action to the matching mutator method.
///
/// # Errors
///
/// Returns whatever error the mutator reports.
pub async fn apply<P, M, X>(
    mutator: &X,
    ctx: &ClusterContext,
    resource: &ResourceRef,
    action: &Action<P, M>,
) -> Result<()>
where
    P: Payload,
    M: Member,
    X: Mutator<P, M> + ?Sized,
{
    if !matches!(action, Action::NoOp) {
        info!("{resource}: {action}");
    }

    match action {
        Action::NoOp => Ok(()),
        Action::Create(payload) => mutator.create(ctx, resource, payload).await,
        Action::Update(payload) => mutator.update(ctx, resource, payload).await,
        Action::Delete => mutator.delete(ctx, resource).await,
        Action::AddMembers(members) => mutator.add_members(ctx, resource, members).await,
        Action::RemoveMembers(members) => mutator.remove_members(ctx, resource, members).await,
    }
}
