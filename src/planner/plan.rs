//! Action plan types.
//!
//! A plan is the ordered list of mutations that takes one resource from its
//! observed state to its desired state. An empty plan is never produced:
//! "nothing to do" is the single-element plan `[NoOp]`.

use std::collections::BTreeSet;
use std::fmt;

/// A single mutation against one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action<P, M> {
    /// Nothing to do.
    NoOp,
    /// Create the resource with this payload.
    Create(P),
    /// Replace the resource's payload.
    Update(P),
    /// Delete the resource.
    Delete,
    /// Grant these members.
    AddMembers(BTreeSet<M>),
    /// Revoke these members.
    RemoveMembers(BTreeSet<M>),
}

impl<P, M> Action<P, M> {
    /// Returns the action name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoOp => "noop",
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete => "delete",
            Self::AddMembers(_) => "add_members",
            Self::RemoveMembers(_) => "remove_members",
        }
    }

    /// Returns true if this action edits the member set.
    #[must_use]
    pub const fn is_member_edit(&self) -> bool {
        matches!(self, Self::AddMembers(_) | Self::RemoveMembers(_))
    }

    /// Returns the payload carried by a create or update.
    #[must_use]
    pub const fn payload(&self) -> Option<&P> {
        match self {
            Self::Create(payload) | Self::Update(payload) => Some(payload),
            _ => None,
        }
    }
}

impl<P, M: fmt::Display> fmt::Display for Action<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddMembers(members) | Self::RemoveMembers(members) => {
                let listed: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "{} [{}]", self.name(), listed.join(", "))
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Ordered list of actions for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPlan<P, M> {
    actions: Vec<Action<P, M>>,
}

impl<P, M> ActionPlan<P, M> {
    /// Creates the plan that does nothing.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            actions: vec![Action::NoOp],
        }
    }

    /// Creates a plan from actions; an empty list becomes `[NoOp]`.
    #[must_use]
    pub fn from_actions(actions: Vec<Action<P, M>>) -> Self {
        if actions.is_empty() {
            Self::noop()
        } else {
            Self { actions }
        }
    }

    /// Returns true iff the plan is exactly `[NoOp]`.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self.actions.as_slice(), [Action::NoOp])
    }

    /// Returns the actions in execution order.
    #[must_use]
    pub fn actions(&self) -> &[Action<P, M>] {
        &self.actions
    }

    /// Returns the number of actions that would change something.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.actions
            .iter()
            .filter(|action| !matches!(action, Action::NoOp))
            .count()
    }
}

impl<P, M: fmt::Display> fmt::Display for ActionPlan<P, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_noop() {
            return write!(f, "no changes");
        }
        let steps: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        write!(f, "{}", steps.join(", then "))
    }
}
