//! Property-based tests for the diff engine.
//!
//! These tests verify that:
//! - Member deltas are exact set differences
//! - A plan is empty exactly when desired and observed agree
//! - Applying a plan converges, and re-planning afterwards is a no-op

use std::collections::BTreeSet;

use dcos_converge::model::ResourceState;
use dcos_converge::planner::{Action, ActionPlan, DiffEngine, member_delta};
use proptest::prelude::*;

type State = ResourceState<String, String>;

fn engine() -> DiffEngine<String> {
    DiffEngine::default()
}

/// Strategy for member sets drawn from a small alphabet, so overlaps are common.
fn arb_members() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(
        prop::sample::select(vec!["a", "b", "c", "d", "e"]).prop_map(String::from),
        0..5,
    )
}

fn arb_payload() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["v1", "v2"]).prop_map(String::from)
}

fn arb_state() -> impl Strategy<Value = State> {
    prop_oneof![
        Just(State::Absent),
        arb_payload().prop_map(State::Present),
        (arb_payload(), arb_members())
            .prop_map(|(payload, members)| State::PresentWithMembers(payload, members)),
    ]
}

/// Applies a plan the way an idempotent control plane would.
fn apply(plan: &ActionPlan<String, String>, observed: &State) -> State {
    let (mut payload, mut members, mut tracked) = match observed.clone() {
        State::Absent => (None, BTreeSet::new(), false),
        State::Present(payload) => (Some(payload), BTreeSet::new(), false),
        State::PresentWithMembers(payload, members) => (Some(payload), members, true),
    };

    for action in plan.actions() {
        match action {
            Action::NoOp => {}
            Action::Create(wanted) => {
                payload = Some(wanted.clone());
                members.clear();
                tracked = false;
            }
            Action::Update(wanted) => payload = Some(wanted.clone()),
            Action::Delete => {
                payload = None;
                members.clear();
                tracked = false;
            }
            Action::AddMembers(added) => {
                members.extend(added.iter().cloned());
                tracked = true;
            }
            Action::RemoveMembers(removed) => {
                members.retain(|member| !removed.contains(member));
                tracked = true;
            }
        }
    }

    match payload {
        None => State::Absent,
        Some(payload) if tracked => State::PresentWithMembers(payload, members),
        Some(payload) => State::Present(payload),
    }
}

fn member_edits(plan: &ActionPlan<String, String>) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut added = BTreeSet::new();
    let mut removed = BTreeSet::new();
    for action in plan.actions() {
        match action {
            Action::AddMembers(members) => added.extend(members.iter().cloned()),
            Action::RemoveMembers(members) => removed.extend(members.iter().cloned()),
            _ => {}
        }
    }
    (added, removed)
}

proptest! {
    /// The add and remove sets are exactly D - O and O - D.
    #[test]
    fn member_delta_is_exact(desired in arb_members(), observed in arb_members()) {
        let (to_add, to_remove) = member_delta(&desired, &observed);

        let expected_add: BTreeSet<String> = desired.difference(&observed).cloned().collect();
        let expected_remove: BTreeSet<String> = observed.difference(&desired).cloned().collect();
        prop_assert_eq!(&to_add, &expected_add);
        prop_assert_eq!(&to_remove, &expected_remove);
        prop_assert!(to_add.is_disjoint(&to_remove));
        prop_assert_eq!(to_add.is_empty() && to_remove.is_empty(), desired == observed);
    }

    /// With equal payloads, the plan edits members iff the sets differ.
    #[test]
    fn member_plan_matches_set_difference(
        payload in arb_payload(),
        desired in arb_members(),
        observed in arb_members(),
    ) {
        let plan = engine().plan(
            &State::PresentWithMembers(payload.clone(), desired.clone()),
            &State::PresentWithMembers(payload, observed.clone()),
        );

        let (added, removed) = member_edits(&plan);
        prop_assert_eq!(added, desired.difference(&observed).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(removed, observed.difference(&desired).cloned().collect::<BTreeSet<_>>());
        prop_assert_eq!(plan.is_noop(), desired == observed);
    }

    /// Applying the plan reaches the desired state, and planning again is a no-op.
    #[test]
    fn applied_plan_converges(desired in arb_state(), observed in arb_state()) {
        let engine = engine();
        let plan = engine.plan(&desired, &observed);
        let after = apply(&plan, &observed);

        prop_assert!(engine.matches(&after, &desired), "{:?} -> {:?}", plan, after);
        prop_assert!(engine.plan(&desired, &after).is_noop());
        prop_assert_eq!(plan.is_noop(), engine.matches(&observed, &desired));
    }

    /// The same inputs always yield the same plan.
    #[test]
    fn plan_is_deterministic(desired in arb_state(), observed in arb_state()) {
        let engine = engine();
        prop_assert_eq!(engine.plan(&desired, &observed), engine.plan(&desired, &observed));
    }
}
