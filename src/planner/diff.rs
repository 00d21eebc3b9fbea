//! Diff engine for comparing desired vs observed state.
//!
//! Diffing is pure: the same desired and observed state always yield the
//! same plan. Payload comparison is delegated to a per-kind predicate so
//! that kinds can ignore fields the control plane fills in on its own.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::error::{ReferenceError, Result};
use crate::model::{DesiredState, Member, ObservedState, Payload, ResourceRef};

use super::plan::{Action, ActionPlan};

type PayloadEq<P> = dyn Fn(&P, &P) -> bool + Send + Sync;

/// Engine for computing plans between desired and observed states.
pub struct DiffEngine<P> {
    /// Payload equality predicate.
    payload_eq: Arc<PayloadEq<P>>,
}

impl<P: Payload> DiffEngine<P> {
    /// Creates a diff engine using the given payload equality predicate.
    #[must_use]
    pub fn new(payload_eq: impl Fn(&P, &P) -> bool + Send + Sync + 'static) -> Self {
        Self {
            payload_eq: Arc::new(payload_eq),
        }
    }

    /// Compares a desired payload against an observed one.
    #[must_use]
    pub fn payload_eq(&self, desired: &P, observed: &P) -> bool {
        (self.payload_eq)(desired, observed)
    }

    /// Computes the plan that takes `observed` to `desired`.
    #[must_use]
    pub fn plan<M: Member>(
        &self,
        desired: &DesiredState<P, M>,
        observed: &ObservedState<P, M>,
    ) -> ActionPlan<P, M> {
        let mut actions = Vec::new();

        match (desired.payload(), observed.payload()) {
            (None, None) => return ActionPlan::noop(),
            (None, Some(_)) => return ActionPlan::from_actions(vec![Action::Delete]),
            (Some(wanted), None) => actions.push(Action::Create(wanted.clone())),
            (Some(wanted), Some(current)) => {
                if !self.payload_eq(wanted, current) {
                    actions.push(Action::Update(wanted.clone()));
                }
            }
        }

        // Plain `Present` leaves members unmanaged.
        if let Some(wanted_members) = desired.members() {
            let none = BTreeSet::new();
            let current_members = observed.members().unwrap_or(&none);
            let (to_add, to_remove) = member_delta(wanted_members, current_members);

            if !to_add.is_empty() {
                actions.push(Action::AddMembers(to_add));
            }
            if !to_remove.is_empty() {
                actions.push(Action::RemoveMembers(to_remove));
            }
        }

        let plan = ActionPlan::from_actions(actions);
        debug!(
            "Planned {} change(s) from {} to {}",
            plan.change_count(),
            observed.label(),
            desired.label()
        );
        plan
    }

    /// Computes a plan after checking that every desired member resolves.
    ///
    /// # Errors
    ///
    /// Returns a reference error, and no plan, if `desired` carries members
    /// and any of them is listed in `unresolved`.
    pub fn plan_checked<M: Member>(
        &self,
        resource: &ResourceRef,
        desired: &DesiredState<P, M>,
        observed: &ObservedState<P, M>,
        unresolved: &BTreeSet<M>,
    ) -> Result<ActionPlan<P, M>> {
        if desired.members().is_some() && !unresolved.is_empty() {
            return Err(ReferenceError {
                resource: resource.clone(),
                missing: unresolved.iter().map(ToString::to_string).collect(),
            }
            .into());
        }

        Ok(self.plan(desired, observed))
    }

    /// Returns true if `observed` already satisfies `desired`.
    ///
    /// Absent matches absent; otherwise payloads must compare equal and,
    /// when desired carries members, the member sets must be identical.
    #[must_use]
    pub fn matches<M: Member>(
        &self,
        observed: &ObservedState<P, M>,
        desired: &DesiredState<P, M>,
    ) -> bool {
        match (desired.payload(), observed.payload()) {
            (None, None) => true,
            (Some(wanted), Some(current)) if self.payload_eq(wanted, current) => {
                desired.members().is_none_or(|wanted_members| {
                    observed
                        .members()
                        .map_or(wanted_members.is_empty(), |current| current == wanted_members)
                })
            }
            _ => false,
        }
    }
}

impl<P: Payload + PartialEq> Default for DiffEngine<P> {
    fn default() -> Self {
        Self::new(|desired: &P, observed: &P| desired == observed)
    }
}

impl<P> Clone for DiffEngine<P> {
    fn clone(&self) -> Self {
        Self {
            payload_eq: Arc::clone(&self.payload_eq),
        }
    }
}

impl<P> fmt::Debug for DiffEngine<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffEngine").finish_non_exhaustive()
    }
}

/// Splits two member sets into `(desired - observed, observed - desired)`.
#[must_use]
pub fn member_delta<M: Ord + Clone>(
    desired: &BTreeSet<M>,
    observed: &BTreeSet<M>,
) -> (BTreeSet<M>, BTreeSet<M>) {
    let to_add = desired.difference(observed).cloned().collect();
    let to_remove = observed.difference(desired).cloned().collect();
    (to_add, to_remove)
}
