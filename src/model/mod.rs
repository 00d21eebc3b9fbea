//! Core data model shared by the engine and its adapters.
//!
//! Everything here is a plain value, built per reconciliation and never
//! shared between resources.

mod context;
mod resource;
mod state;

pub use context::ClusterContext;
pub use resource::{ResourceKind, ResourceRef};
pub use state::{DesiredState, Member, NoMembers, ObservedState, Payload, ResourceState};
