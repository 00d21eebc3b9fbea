//! Contracts between the engine and a control plane.
//!
//! A control plane is reached through two small capabilities: a read-only
//! [`StateProbe`] and an idempotent [`Mutator`]. Per-kind behaviour lives in
//! the payload and member types, not in extra trait methods.

mod mutator;
mod planned;
mod probe;

pub use mutator::{Mutator, apply};
pub use planned::{PlannedChanges, PlannedProbe};
pub use probe::StateProbe;
