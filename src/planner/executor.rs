//! Plan executor for applying action plans.
//!
//! Actions run strictly in plan order. The first failure aborts the rest of
//! the plan and is surfaced unchanged; nothing is rolled back.

use tracing::{debug, error};

use crate::adapter::{self, Mutator};
use crate::error::Result;
use crate::model::{ClusterContext, Member, Payload, ResourceRef};

use super::plan::{Action, ActionPlan};

/// Executor for action plans.
#[derive(Debug)]
pub struct PlanExecutor<'a, X: ?Sized> {
    /// Mutator the actions are sent to.
    mutator: &'a X,
    /// Cluster being driven.
    ctx: &'a ClusterContext,
}

/// Outcome of a single action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The mutator applied the action.
    Applied,
    /// The action was not sent to the mutator.
    Skipped,
}

/// Result of executing a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResult {
    /// Action index within the plan.
    pub index: usize,
    /// Action name.
    pub action: &'static str,
    /// What happened to it.
    pub outcome: ActionOutcome,
}

/// Result of executing the entire plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Individual action results, in plan order.
    pub results: Vec<ActionResult>,
}

impl ExecutionResult {
    /// Number of actions the mutator applied.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.count(ActionOutcome::Applied)
    }

    /// Number of actions that were skipped.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(ActionOutcome::Skipped)
    }

    fn count(&self, outcome: ActionOutcome) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == outcome)
            .count()
    }
}

impl<'a, X: ?Sized> PlanExecutor<'a, X> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(mutator: &'a X, ctx: &'a ClusterContext) -> Self {
        Self { mutator, ctx }
    }

    /// Executes a plan against one resource.
    ///
    /// Member edits that follow a `Delete` are skipped since the resource
    /// they would apply to is gone.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the mutator. Later actions are
    /// not attempted.
    pub async fn execute<P, M>(
        &self,
        resource: &ResourceRef,
        plan: &ActionPlan<P, M>,
    ) -> Result<ExecutionResult>
    where
        P: Payload,
        M: Member,
        X: Mutator<P, M>,
    {
        debug!(
            "Executing {} action(s) against {resource}",
            plan.actions().len()
        );

        let mut results = Vec::with_capacity(plan.actions().len());
        let mut deleted = false;

        for (index, action) in plan.actions().iter().enumerate() {
            let skip = matches!(action, Action::NoOp) || (deleted && action.is_member_edit());
            if skip {
                debug!("Skipping {} on {resource}", action.name());
                results.push(ActionResult {
                    index,
                    action: action.name(),
                    outcome: ActionOutcome::Skipped,
                });
                continue;
            }

            if let Err(e) = adapter::apply(self.mutator, self.ctx, resource, action).await {
                error!("{} on {resource} failed: {e}", action.name());
                return Err(e);
            }

            deleted |= matches!(action, Action::Delete);
            results.push(ActionResult {
                index,
                action: action.name(),
                outcome: ActionOutcome::Applied,
            });
        }

        Ok(ExecutionResult { results })
    }
}
