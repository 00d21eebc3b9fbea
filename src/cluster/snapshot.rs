//! On-disk snapshot of a cluster's resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::ResourceRef;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Number of journal entries kept in a snapshot.
pub const JOURNAL_LIMIT: usize = 100;

/// One stored resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResource {
    /// Encoded payload.
    pub payload: serde_json::Value,
    /// Encoded members, for kinds that carry a member set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<serde_json::Value>>,
}

impl StoredResource {
    /// Returns the number of stored members, if the resource has a member set.
    #[must_use]
    pub fn member_count(&self) -> Option<usize> {
        self.members.as_ref().map(Vec::len)
    }
}

/// Record of one applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the mutation was applied.
    pub timestamp: DateTime<Utc>,
    /// Resource that was mutated.
    pub resource: ResourceRef,
    /// Name of the applied action.
    pub action: String,
}

/// Everything a cluster file holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Snapshot format version.
    pub version: String,
    /// Name of the cluster the snapshot belongs to.
    pub cluster: String,
    /// Time of the last mutation.
    pub updated_at: DateTime<Utc>,
    /// Resources keyed by kind, then identifier.
    #[serde(default)]
    pub resources: BTreeMap<String, BTreeMap<String, StoredResource>>,
    /// Most recent mutations, oldest first.
    #[serde(default)]
    pub journal: Vec<JournalEntry>,
}

impl ClusterSnapshot {
    /// Creates an empty snapshot for a cluster.
    #[must_use]
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            cluster: cluster.into(),
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Returns the stored record for a resource.
    #[must_use]
    pub fn get(&self, resource: &ResourceRef) -> Option<&StoredResource> {
        self.resources
            .get(resource.kind.as_str())
            .and_then(|by_id| by_id.get(&resource.id))
    }

    /// Returns true if the resource exists.
    #[must_use]
    pub fn contains(&self, resource: &ResourceRef) -> bool {
        self.get(resource).is_some()
    }

    /// Stores a record, replacing any previous one.
    pub fn insert(&mut self, resource: &ResourceRef, stored: StoredResource) {
        self.resources
            .entry(resource.kind.as_str().to_string())
            .or_default()
            .insert(resource.id.clone(), stored);
    }

    /// Removes a record, returning it if it existed.
    pub fn remove(&mut self, resource: &ResourceRef) -> Option<StoredResource> {
        let by_id = self.resources.get_mut(resource.kind.as_str())?;
        let removed = by_id.remove(&resource.id);
        if by_id.is_empty() {
            self.resources.remove(resource.kind.as_str());
        }
        removed
    }

    /// Appends a journal entry, dropping the oldest beyond [`JOURNAL_LIMIT`].
    pub fn record(&mut self, resource: &ResourceRef, action: &str) {
        let now = Utc::now();
        self.updated_at = now;
        self.journal.push(JournalEntry {
            timestamp: now,
            resource: resource.clone(),
            action: action.to_string(),
        });

        if self.journal.len() > JOURNAL_LIMIT {
            let excess = self.journal.len() - JOURNAL_LIMIT;
            self.journal.drain(..excess);
        }
    }

    /// Returns the total number of stored resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    /// Iterates over `(kind, id, record)` in kind then identifier order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &StoredResource)> {
        self.resources.iter().flat_map(|(kind, by_id)| {
            by_id
                .iter()
                .map(move |(id, stored)| (kind.as_str(), id.as_str(), stored))
        })
    }
}
