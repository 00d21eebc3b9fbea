//! Planning module for reconciliation.
//!
//! This module compares desired and observed state, producing ordered
//! action plans, and executes those plans through a mutator.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffEngine, member_delta};
pub use executor::{ActionOutcome, ActionResult, ExecutionResult, PlanExecutor};
pub use plan::{Action, ActionPlan};
