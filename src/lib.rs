// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # dcos-converge
//!
//! A declarative, idempotent reconciliation engine for DC/OS cluster resources.
//!
//! ## Overview
//!
//! Every resource, whatever its kind, is driven the same way:
//!
//! 1. **Observe**: probe the control plane for the resource's current state
//! 2. **Diff**: compare desired and observed state into an ordered plan
//! 3. **Execute**: apply the plan through a mutator, stopping at the first error
//! 4. **Poll**: re-probe with bounded exponential backoff until the change shows
//!
//! Running the same declaration twice is a no-op the second time.
//!
//! ## Modules
//!
//! - [`model`]: Resource identity and tri-state resource state
//! - [`planner`]: Diff computation, action plans and plan execution
//! - [`adapter`]: Probe and mutator traits implemented by control planes
//! - [`poller`]: Retry policies and poll-until-converged
//! - [`reconciler`]: The per-resource reconciliation loop
//! - [`resources`]: Payloads, members and equality for each resource kind
//! - [`config`]: Manifest parsing, validation and payload fingerprints
//! - [`cluster`]: Local file-backed control plane
//! - [`runner`]: Applies a whole manifest and reports per resource
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! cluster:
//!   name: prod
//!
//! resources:
//!   - kind: iam_group
//!     gid: ops
//!     permissions:
//!       - { rid: "dcos:adminrouter:service:marathon", action: full }
//!   - kind: app
//!     id: /web
//!     definition:
//!       cpus: 0.5
//!       instances: 2
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod adapter;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod model;
pub mod planner;
pub mod poller;
pub mod reconciler;
pub mod resources;
pub mod runner;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{Mutator, StateProbe};
pub use cli::{Cli, Commands, OutputFormatter};
pub use cluster::LocalCluster;
pub use config::{Manifest, ManifestParser, ManifestValidator, PayloadHasher};
pub use error::{ConvergeError, Result};
pub use model::{ClusterContext, ResourceKind, ResourceRef, ResourceState};
pub use planner::{Action, ActionPlan, DiffEngine, PlanExecutor};
pub use poller::{ConvergencePoller, RetryPolicy};
pub use reconciler::{ConvergenceResult, ConvergenceStatus, Reconciler};
pub use runner::{ManifestRunner, ReportStatus, RunReport};
