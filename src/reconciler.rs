//! Reconciler for driving one resource to its desired state.
//!
//! A reconciliation is probe, diff, then either report (dry run) or execute
//! and poll until the control plane reflects the change. Each call is
//! self-contained; the reconciler itself only holds immutable
//! configuration, so independent resources can be reconciled concurrently.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::adapter::{Mutator, StateProbe};
use crate::error::{ConvergeError, Result};
use crate::model::{ClusterContext, DesiredState, Member, ObservedState, Payload, ResourceRef};
use crate::planner::{ActionPlan, DiffEngine, PlanExecutor};
use crate::poller::ConvergencePoller;

/// How a reconciliation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// Observed already matched desired; nothing was done.
    InSync,
    /// Dry run: the plan was computed but not applied.
    Planned,
    /// The plan was applied and the control plane reflects it.
    Converged,
    /// The plan was applied but the retry budget ran out first.
    TimedOut,
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => write!(f, "in sync"),
            Self::Planned => write!(f, "planned"),
            Self::Converged => write!(f, "converged"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Result of reconciling one resource.
#[derive(Debug, Clone)]
pub struct ConvergenceResult<P, M> {
    /// Resource that was reconciled.
    pub resource: ResourceRef,
    /// Whether the plan called for any change.
    pub changed: bool,
    /// The plan that was computed.
    pub plan: ActionPlan<P, M>,
    /// Last observed state.
    pub final_state: ObservedState<P, M>,
    /// Backoff rounds spent polling.
    pub attempts: u32,
    /// How the reconciliation ended.
    pub status: ConvergenceStatus,
}

impl<P, M> ConvergenceResult<P, M> {
    /// Returns true unless polling ran out of attempts.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !matches!(self.status, ConvergenceStatus::TimedOut)
    }

    /// Converts a timed-out result into an error.
    ///
    /// # Errors
    ///
    /// Returns a convergence timeout error if the status is `TimedOut`.
    pub fn into_result(self) -> Result<Self> {
        if self.is_settled() {
            Ok(self)
        } else {
            Err(ConvergeError::ConvergenceTimeout {
                resource: self.resource,
                attempts: self.attempts,
            })
        }
    }
}

/// Reconciler for one resource kind.
pub struct Reconciler<'a, P> {
    /// Cluster being driven.
    ctx: &'a ClusterContext,
    /// Diff engine with the kind's payload equality.
    diff_engine: DiffEngine<P>,
    /// Poller used after mutations.
    poller: ConvergencePoller,
    /// Compute plans without applying them.
    dry_run: bool,
}

impl<'a, P: Payload> Reconciler<'a, P> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(
        ctx: &'a ClusterContext,
        diff_engine: DiffEngine<P>,
        poller: ConvergencePoller,
    ) -> Self {
        Self {
            ctx,
            diff_engine,
            poller,
            dry_run: false,
        }
    }

    /// Sets whether to stop after planning.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconciles `resource` towards `desired`.
    ///
    /// `converge` decides when a re-probed state counts as converged; use
    /// [`DiffEngine::matches`] for exact agreement.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails, a desired member does not
    /// resolve, or a mutation is refused. A timeout is reported in the
    /// result status, not as an error.
    pub async fn reconcile<M, S, X, F>(
        &self,
        resource: &ResourceRef,
        desired: DesiredState<P, M>,
        probe: &S,
        mutator: &X,
        converge: F,
    ) -> Result<ConvergenceResult<P, M>>
    where
        M: Member,
        S: StateProbe<P, M> + ?Sized,
        X: Mutator<P, M> + ?Sized,
        F: Fn(&ObservedState<P, M>, &DesiredState<P, M>) -> bool,
    {
        debug!("Reconciling {resource} towards {}", desired.label());

        let observed = probe.observe(self.ctx, resource).await?;
        debug!("Observed {resource} as {}", observed.label());

        let unresolved = match desired.members() {
            Some(members) if !members.is_empty() => {
                probe.unresolved_members(self.ctx, resource, members).await?
            }
            _ => BTreeSet::new(),
        };
        let plan = self
            .diff_engine
            .plan_checked(resource, &desired, &observed, &unresolved)?;

        if plan.is_noop() {
            debug!("{resource} is in sync");
            return Ok(ConvergenceResult {
                resource: resource.clone(),
                changed: false,
                plan,
                final_state: observed,
                attempts: 0,
                status: ConvergenceStatus::InSync,
            });
        }

        if self.dry_run {
            info!("{resource} would change: {plan}");
            return Ok(ConvergenceResult {
                resource: resource.clone(),
                changed: true,
                plan,
                final_state: observed,
                attempts: 0,
                status: ConvergenceStatus::Planned,
            });
        }

        info!("Applying {resource}: {plan}");
        let execution = PlanExecutor::new(mutator, self.ctx)
            .execute(resource, &plan)
            .await?;
        debug!(
            "{resource}: {} action(s) applied, {} skipped",
            execution.applied(),
            execution.skipped()
        );

        let mut result = self
            .poller
            .await_state(probe, self.ctx, resource, &desired, converge)
            .await?;
        if result.status == ConvergenceStatus::TimedOut {
            warn!(
                "{resource} did not converge within {:?}",
                self.poller.policy().ceiling()
            );
        }

        result.changed = true;
        result.plan = plan;
        Ok(result)
    }
}
