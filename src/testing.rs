//! In-memory control plane shared by the engine's unit tests.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::adapter::{Mutator, StateProbe};
use crate::error::{ConvergeError, MutationError, MutationErrorKind, Result};
use crate::model::{ClusterContext, ObservedState, ResourceRef, ResourceState};

type State = ResourceState<String, String>;

/// A fake control plane whose mutations become visible after `lag` probes.
pub struct FakeCluster {
    actual: Mutex<State>,
    visible: Mutex<State>,
    lag: u32,
    stale_probes: AtomicU32,
    probes: AtomicU32,
    calls: Mutex<Vec<String>>,
    tracks_members: bool,
    fail_on: Option<&'static str>,
    unresolved: BTreeSet<String>,
    unreachable: bool,
}

impl FakeCluster {
    pub fn new(initial: State) -> Self {
        let tracks_members = initial.members().is_some();
        Self {
            actual: Mutex::new(initial.clone()),
            visible: Mutex::new(initial),
            lag: 0,
            stale_probes: AtomicU32::new(0),
            probes: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            tracks_members,
            fail_on: None,
            unresolved: BTreeSet::new(),
            unreachable: false,
        }
    }

    pub const fn with_lag(mut self, lag: u32) -> Self {
        self.lag = lag;
        self
    }

    pub const fn tracking_members(mut self) -> Self {
        self.tracks_members = true;
        self
    }

    pub const fn failing_on(mut self, action: &'static str) -> Self {
        self.fail_on = Some(action);
        self
    }

    pub fn with_unresolved(mut self, members: &[&str]) -> Self {
        self.unresolved = members.iter().map(|member| (*member).to_string()).collect();
        self
    }

    pub const fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn probes(&self) -> u32 {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn current(&self) -> State {
        self.actual.lock().expect("state lock").clone()
    }

    fn mutate(
        &self,
        resource: &ResourceRef,
        action: &'static str,
        change: impl FnOnce(&mut State),
    ) -> Result<()> {
        self.calls.lock().expect("calls lock").push(action.to_string());
        if self.fail_on == Some(action) {
            return Err(MutationError::new(
                resource,
                action,
                MutationErrorKind::Rejected,
                "refused by fake",
            )
            .into());
        }

        let mut state = self.actual.lock().expect("state lock");
        change(&mut *state);
        drop(state);
        self.stale_probes.store(self.lag, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl StateProbe<String, String> for FakeCluster {
    async fn observe(
        &self,
        _ctx: &ClusterContext,
        resource: &ResourceRef,
    ) -> Result<ObservedState<String, String>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(ConvergeError::unreachable(resource, "connection refused"));
        }

        let mut visible = self.visible.lock().expect("visible lock");
        let stale = self.stale_probes.load(Ordering::SeqCst);
        if stale > 0 {
            self.stale_probes.store(stale - 1, Ordering::SeqCst);
        } else {
            *visible = self.current();
        }
        Ok(visible.clone())
    }

    async fn unresolved_members(
        &self,
        _ctx: &ClusterContext,
        _resource: &ResourceRef,
        members: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>> {
        Ok(members.intersection(&self.unresolved).cloned().collect())
    }
}

#[async_trait]
impl Mutator<String, String> for FakeCluster {
    async fn create(
        &self,
        _ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &String,
    ) -> Result<()> {
        let tracks_members = self.tracks_members;
        self.mutate(resource, "create", |state| {
            *state = if tracks_members {
                State::PresentWithMembers(payload.clone(), BTreeSet::new())
            } else {
                State::Present(payload.clone())
            };
        })
    }

    async fn update(
        &self,
        _ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &String,
    ) -> Result<()> {
        self.mutate(resource, "update", |state| {
            *state = match state.members() {
                Some(members) => State::PresentWithMembers(payload.clone(), members.clone()),
                None => State::Present(payload.clone()),
            };
        })
    }

    async fn delete(&self, _ctx: &ClusterContext, resource: &ResourceRef) -> Result<()> {
        self.mutate(resource, "delete", |state| *state = State::Absent)
    }

    async fn add_members(
        &self,
        _ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<String>,
    ) -> Result<()> {
        self.mutate(resource, "add_members", |state| {
            if let Some(payload) = state.payload().cloned() {
                let mut current = state.members().cloned().unwrap_or_default();
                current.extend(members.iter().cloned());
                *state = State::PresentWithMembers(payload, current);
            }
        })
    }

    async fn remove_members(
        &self,
        _ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<String>,
    ) -> Result<()> {
        self.mutate(resource, "remove_members", |state| {
            if let Some(payload) = state.payload().cloned() {
                let mut current = state.members().cloned().unwrap_or_default();
                current.retain(|member| !members.contains(member));
                *state = State::PresentWithMembers(payload, current);
            }
        })
    }
}
