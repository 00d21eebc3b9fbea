//! Typed resource kinds.
//!
//! Each kind supplies its payload and member types, how a manifest
//! declaration becomes a desired state, and when two payloads count as
//! equal. The engine itself stays generic.

pub mod iam;
pub mod marathon;
pub mod package;
pub mod quota;
pub mod secret;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{DesiredState, Member, Payload, ResourceKind, ResourceRef};
use crate::planner::DiffEngine;

/// Per-kind behaviour plugged into the generic engine.
pub trait KindSpec: 'static {
    /// What the control plane stores for one resource.
    type Payload: Payload + PartialEq + Serialize + DeserializeOwned;
    /// Element of the resource's member set.
    type Member: Member + Serialize + DeserializeOwned;
    /// Manifest declaration of one resource.
    type Decl;

    /// The kind these declarations reconcile.
    const KIND: ResourceKind;

    /// Returns the reference a declaration is reconciled under.
    fn resource_ref(decl: &Self::Decl) -> ResourceRef;

    /// Builds the desired state from a declaration.
    fn desired(decl: &Self::Decl) -> DesiredState<Self::Payload, Self::Member>;

    /// Returns true if an observed payload satisfies a desired one.
    fn payload_eq(desired: &Self::Payload, observed: &Self::Payload) -> bool {
        desired == observed
    }

    /// Returns a diff engine using this kind's payload equality.
    #[must_use]
    fn diff_engine() -> DiffEngine<Self::Payload> {
        DiffEngine::new(Self::payload_eq)
    }
}
