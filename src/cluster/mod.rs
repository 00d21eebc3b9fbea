//! Local cluster backend.
//!
//! A [`LocalCluster`] implements both [`StateProbe`](crate::adapter::StateProbe)
//! and [`Mutator`](crate::adapter::Mutator) for every resource kind by
//! storing payloads and member sets in a JSON snapshot file.

mod local;
mod snapshot;

pub use local::LocalCluster;
pub use snapshot::{ClusterSnapshot, JOURNAL_LIMIT, JournalEntry, SNAPSHOT_VERSION, StoredResource};
