//! Dry-run view of a control plane.
//!
//! A dry run applies nothing, so a resource planned earlier in the same run
//! is still missing when a later resource references it. [`PlannedProbe`]
//! answers reference checks as if the earlier plans had been applied.

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{ClusterContext, Member, ObservedState, Payload, ResourceRef};
use crate::planner::{Action, ActionPlan};

use super::StateProbe;

/// Resources a dry run has planned to create or delete so far.
#[derive(Debug, Clone, Default)]
pub struct PlannedChanges {
    created: BTreeSet<ResourceRef>,
    deleted: BTreeSet<ResourceRef>,
}

impl PlannedChanges {
    /// Creates an empty set of planned changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the existence changes `plan` would make to `resource`.
    pub fn record<P, M>(&mut self, resource: &ResourceRef, plan: &ActionPlan<P, M>) {
        for action in plan.actions() {
            match action {
                Action::Create(_) => {
                    self.deleted.remove(resource);
                    self.created.insert(resource.clone());
                }
                Action::Delete => {
                    self.created.remove(resource);
                    self.deleted.insert(resource.clone());
                }
                _ => {}
            }
        }
    }

    /// Returns true if nothing has been planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    fn creates(&self, resource: &ResourceRef) -> bool {
        self.created.contains(resource)
    }

    fn deletes(&self, resource: &ResourceRef) -> bool {
        self.deleted.contains(resource)
    }
}

/// Probe that overlays [`PlannedChanges`] on another probe's reference checks.
///
/// Observation is passed through untouched.
pub struct PlannedProbe<'a, S: ?Sized> {
    inner: &'a S,
    planned: &'a PlannedChanges,
}

impl<'a, S: ?Sized> PlannedProbe<'a, S> {
    /// Wraps `inner` with the changes planned so far.
    #[must_use]
    pub const fn new(inner: &'a S, planned: &'a PlannedChanges) -> Self {
        Self { inner, planned }
    }
}

#[async_trait]
impl<'a, P, M, S> StateProbe<P, M> for PlannedProbe<'a, S>
where
    P: Payload,
    M: Member,
    S: StateProbe<P, M> + ?Sized,
{
    async fn observe(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
    ) -> Result<ObservedState<P, M>> {
        self.inner.observe(ctx, resource).await
    }

    async fn unresolved_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<BTreeSet<M>> {
        let missing = self.inner.unresolved_members(ctx, resource, members).await?;
        if self.planned.is_empty() {
            return Ok(missing);
        }

        Ok(members
            .iter()
            .filter(|member| match member.referenced() {
                Some(target) if self.planned.deletes(&target) => true,
                Some(target) if self.planned.creates(&target) => false,
                _ => missing.contains(member),
            })
            .cloned()
            .collect())
    }
}
