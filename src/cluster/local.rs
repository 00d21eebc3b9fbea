//! Local file-backed control plane.
//!
//! Keeps every resource of one cluster in a single JSON file. Useful for
//! rehearsing a manifest, for tests, and as the reference implementation of
//! the probe and mutator contracts.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::adapter::{Mutator, StateProbe};
use crate::error::{ClusterError, ConvergeError, MutationError, MutationErrorKind, Result};
use crate::model::{ClusterContext, Member, ObservedState, Payload, ResourceRef, ResourceState};

use super::snapshot::{ClusterSnapshot, StoredResource};

/// Directory under the user's configuration directory holding cluster files.
const CLUSTER_DIR: &str = "dcos-converge";

/// A control plane persisted to a local JSON file.
#[derive(Debug)]
pub struct LocalCluster {
    /// Path to the cluster file.
    path: PathBuf,
    /// In-memory copy of the file; writers hold the lock while persisting.
    snapshot: Mutex<ClusterSnapshot>,
}

impl LocalCluster {
    /// Opens the cluster file at `path`, starting empty if it does not exist.
    ///
    /// The file is only written on the first mutation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn open(path: impl Into<PathBuf>, cluster: &str) -> Result<Self> {
        let path = path.into();

        let snapshot = if path.exists() {
            info!("Loading cluster file from: {}", path.display());
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| corrupted(&path, format!("Failed to read cluster file: {e}")))?;
            serde_json::from_str(&content)
                .map_err(|e| corrupted(&path, format!("Failed to parse cluster file: {e}")))?
        } else {
            debug!("Cluster file does not exist: {}", path.display());
            ClusterSnapshot::new(cluster)
        };

        Ok(Self {
            path,
            snapshot: Mutex::new(snapshot),
        })
    }

    /// Returns the default cluster file for a cluster name.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn default_path(cluster: &str) -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or_else(|| ClusterError::NoLocation {
            message: "no configuration directory on this platform".to_string(),
        })?;
        Ok(base.join(CLUSTER_DIR).join(format!("{cluster}.json")))
    }

    /// Returns the path of the cluster file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns a copy of the current snapshot.
    pub async fn snapshot(&self) -> ClusterSnapshot {
        self.snapshot.lock().await.clone()
    }

    fn ensure_cluster(
        &self,
        snapshot: &ClusterSnapshot,
        ctx: &ClusterContext,
        resource: &ResourceRef,
    ) -> Result<()> {
        if snapshot.cluster == ctx.name {
            return Ok(());
        }

        Err(ConvergeError::unreachable(
            resource,
            format!(
                "{} holds cluster '{}', not '{}'",
                self.path.display(),
                snapshot.cluster,
                ctx.name
            ),
        ))
    }

    /// Applies `change` to a copy of the snapshot, persists it and swaps it
    /// in. `change` returns false when there is nothing to do.
    async fn mutate(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        action: &'static str,
        change: impl FnOnce(&mut ClusterSnapshot) -> Result<bool> + Send,
    ) -> Result<()> {
        let mut current = self.snapshot.lock().await;
        self.ensure_cluster(&current, ctx, resource)?;

        let mut next = current.clone();
        if !change(&mut next)? {
            debug!("{resource}: {action} already applied");
            return Ok(());
        }

        next.record(resource, action);
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    async fn persist(&self, snapshot: &ClusterSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            debug!("Creating cluster directory: {}", parent.display());
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(snapshot).map_err(|e| {
            ClusterError::serialization(format!("Failed to serialize snapshot: {e}"))
        })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Cluster file saved: {}", self.path.display());
        Ok(())
    }
}

fn corrupted(path: &Path, message: String) -> ConvergeError {
    ClusterError::Corrupted {
        path: path.to_path_buf(),
        message,
    }
    .into()
}

fn not_found(resource: &ResourceRef, action: &'static str) -> ConvergeError {
    MutationError::new(
        resource,
        action,
        MutationErrorKind::NotFound,
        "resource does not exist",
    )
    .into()
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ClusterError::serialization(format!("Failed to encode value: {e}")).into())
}

fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| ClusterError::serialization(format!("Failed to decode value: {e}")).into())
}

fn decode_state<P, M>(stored: &StoredResource) -> Result<ObservedState<P, M>>
where
    P: DeserializeOwned,
    M: Ord + DeserializeOwned,
{
    let payload = decode(&stored.payload)?;
    match &stored.members {
        Some(members) => {
            let members = members.iter().map(decode).collect::<Result<BTreeSet<M>>>()?;
            Ok(ResourceState::PresentWithMembers(payload, members))
        }
        None => Ok(ResourceState::Present(payload)),
    }
}

/// Decodes the stored member set, lets `edit` change it and stores it back.
fn edit_members<M>(
    snapshot: &mut ClusterSnapshot,
    resource: &ResourceRef,
    action: &'static str,
    edit: impl FnOnce(&mut BTreeSet<M>) -> bool,
) -> Result<bool>
where
    M: Member + Serialize + DeserializeOwned,
{
    let Some(existing) = snapshot.get(resource) else {
        return Err(not_found(resource, action));
    };

    let mut members = existing
        .members
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(decode)
        .collect::<Result<BTreeSet<M>>>()?;
    if !edit(&mut members) {
        return Ok(false);
    }

    let updated = StoredResource {
        payload: existing.payload.clone(),
        members: Some(members.iter().map(encode).collect::<Result<Vec<_>>>()?),
    };
    snapshot.insert(resource, updated);
    Ok(true)
}

#[async_trait]
impl<P, M> StateProbe<P, M> for LocalCluster
where
    P: Payload + Serialize + DeserializeOwned,
    M: Member + Serialize + DeserializeOwned,
{
    async fn observe(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
    ) -> Result<ObservedState<P, M>> {
        let snapshot = self.snapshot.lock().await;
        self.ensure_cluster(&snapshot, ctx, resource)?;

        debug!("Observing {resource} in {}", self.path.display());
        match snapshot.get(resource) {
            Some(stored) => decode_state(stored),
            None => Ok(ResourceState::Absent),
        }
    }

    async fn unresolved_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<BTreeSet<M>> {
        let snapshot = self.snapshot.lock().await;
        self.ensure_cluster(&snapshot, ctx, resource)?;

        Ok(members
            .iter()
            .filter(|member| {
                member
                    .referenced()
                    .is_some_and(|target| !snapshot.contains(&target))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl<P, M> Mutator<P, M> for LocalCluster
where
    P: Payload + Serialize + DeserializeOwned,
    M: Member + Serialize + DeserializeOwned,
{
    async fn create(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &P,
    ) -> Result<()> {
        let encoded = encode(payload)?;
        let members = resource.kind.has_members().then(Vec::new);

        self.mutate(ctx, resource, "create", move |snapshot| {
            match snapshot.get(resource) {
                Some(existing) if existing.payload == encoded => Ok(false),
                Some(_) => Err(MutationError::new(
                    resource,
                    "create",
                    MutationErrorKind::AlreadyExists,
                    "a different payload is already stored",
                )
                .into()),
                None => {
                    snapshot.insert(
                        resource,
                        StoredResource {
                            payload: encoded,
                            members,
                        },
                    );
                    Ok(true)
                }
            }
        })
        .await
    }

    async fn update(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        payload: &P,
    ) -> Result<()> {
        let encoded = encode(payload)?;

        self.mutate(ctx, resource, "update", move |snapshot| {
            let Some(existing) = snapshot.get(resource) else {
                return Err(not_found(resource, "update"));
            };
            if existing.payload == encoded {
                return Ok(false);
            }

            let members = existing.members.clone();
            snapshot.insert(
                resource,
                StoredResource {
                    payload: encoded,
                    members,
                },
            );
            Ok(true)
        })
        .await
    }

    async fn delete(&self, ctx: &ClusterContext, resource: &ResourceRef) -> Result<()> {
        self.mutate(ctx, resource, "delete", |snapshot| {
            Ok(snapshot.remove(resource).is_some())
        })
        .await
    }

    async fn add_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<()> {
        self.mutate(ctx, resource, "add_members", |snapshot| {
            edit_members::<M>(snapshot, resource, "add_members", |current| {
                let before = current.len();
                current.extend(members.iter().cloned());
                current.len() != before
            })
        })
        .await
    }

    async fn remove_members(
        &self,
        ctx: &ClusterContext,
        resource: &ResourceRef,
        members: &BTreeSet<M>,
    ) -> Result<()> {
        self.mutate(ctx, resource, "remove_members", |snapshot| {
            edit_members::<M>(snapshot, resource, "remove_members", |current| {
                let before = current.len();
                current.retain(|member| !members.contains(member));
                current.len() != before
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NoMembers, ResourceKind};
    use crate::resources::iam::{GroupId, IamProfile};
    use serde_json::json;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    type Plain = ObservedState<Value, NoMembers>;
    type User = ObservedState<IamProfile, GroupId>;

    fn ctx() -> ClusterContext {
        ClusterContext::new("prod")
    }

    fn app() -> ResourceRef {
        ResourceRef::new(ResourceKind::App, "/web")
    }

    fn profile() -> IamProfile {
        IamProfile {
            description: "Alice".to_string(),
        }
    }

    fn groups(ids: &[&str]) -> BTreeSet<GroupId> {
        ids.iter().map(|id| GroupId((*id).to_string())).collect()
    }

    async fn open(temp_dir: &TempDir) -> LocalCluster {
        LocalCluster::open(temp_dir.path().join("prod.json"), "prod")
            .await
            .expect("Failed to open cluster")
    }

    async fn create(cluster: &LocalCluster, resource: &ResourceRef, payload: Value) -> Result<()> {
        Mutator::<Value, NoMembers>::create(cluster, &ctx(), resource, &payload).await
    }

    async fn observe(cluster: &LocalCluster, resource: &ResourceRef) -> Plain {
        StateProbe::<Value, NoMembers>::observe(cluster, &ctx(), resource)
            .await
            .expect("Failed to observe")
    }

    #[tokio::test]
    async fn test_empty_cluster_observes_absent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;

        assert_eq!(observe(&cluster, &app()).await, ResourceState::Absent);
        assert!(!cluster.path().exists());
    }

    #[tokio::test]
    async fn test_create_survives_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;

        assert_ok!(create(&cluster, &app(), json!({"cpus": 1})).await);
        drop(cluster);

        let reopened = open(&temp_dir).await;
        assert_eq!(
            observe(&reopened, &app()).await,
            ResourceState::Present(json!({"cpus": 1}))
        );

        let snapshot = reopened.snapshot().await;
        assert_eq!(snapshot.journal.len(), 1);
        assert_eq!(snapshot.journal[0].action, "create");
        assert_eq!(snapshot.journal[0].resource, app());
    }

    #[tokio::test]
    async fn test_create_replay_and_conflict() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;

        assert_ok!(create(&cluster, &app(), json!({"cpus": 1})).await);
        assert_ok!(create(&cluster, &app(), json!({"cpus": 1})).await);

        let err = assert_err!(create(&cluster, &app(), json!({"cpus": 2})).await);
        assert!(matches!(
            err,
            ConvergeError::Mutation(MutationError {
                kind: MutationErrorKind::AlreadyExists,
                ..
            })
        ));
        assert_eq!(cluster.snapshot().await.journal.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;

        let err = assert_err!(
            Mutator::<Value, NoMembers>::update(&cluster, &ctx(), &app(), &json!({})).await
        );
        assert!(matches!(
            err,
            ConvergeError::Mutation(MutationError {
                kind: MutationErrorKind::NotFound,
                action: "update",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_members() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;
        let user = ResourceRef::new(ResourceKind::IamUser, "alice");

        assert_ok!(Mutator::<IamProfile, GroupId>::create(&cluster, &ctx(), &user, &profile()).await);
        assert_ok!(Mutator::<IamProfile, GroupId>::add_members(&cluster, &ctx(), &user, &groups(&["ops"])).await);

        let renamed = IamProfile {
            description: "Alice Smith".to_string(),
        };
        assert_ok!(Mutator::<IamProfile, GroupId>::update(&cluster, &ctx(), &user, &renamed).await);

        let observed: User = assert_ok!(StateProbe::observe(&cluster, &ctx(), &user).await);
        assert_eq!(observed, ResourceState::PresentWithMembers(renamed, groups(&["ops"])));
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;

        assert_ok!(Mutator::<Value, NoMembers>::delete(&cluster, &ctx(), &app()).await);
        assert!(cluster.snapshot().await.journal.is_empty());
        assert!(!cluster.path().exists());
    }

    #[tokio::test]
    async fn test_member_edits_are_set_operations() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;
        let user = ResourceRef::new(ResourceKind::IamUser, "alice");

        assert_ok!(Mutator::<IamProfile, GroupId>::create(&cluster, &ctx(), &user, &profile()).await);
        let observed: User = assert_ok!(StateProbe::observe(&cluster, &ctx(), &user).await);
        assert_eq!(observed, ResourceState::PresentWithMembers(profile(), BTreeSet::new()));

        assert_ok!(Mutator::<IamProfile, GroupId>::add_members(&cluster, &ctx(), &user, &groups(&["ops", "dev"])).await);
        assert_ok!(Mutator::<IamProfile, GroupId>::add_members(&cluster, &ctx(), &user, &groups(&["ops"])).await);
        assert_ok!(Mutator::<IamProfile, GroupId>::remove_members(&cluster, &ctx(), &user, &groups(&["dev", "qa"])).await);

        let observed: User = assert_ok!(StateProbe::observe(&cluster, &ctx(), &user).await);
        assert_eq!(observed, ResourceState::PresentWithMembers(profile(), groups(&["ops"])));

        let actions: Vec<String> = cluster
            .snapshot()
            .await
            .journal
            .into_iter()
            .map(|entry| entry.action)
            .collect();
        assert_eq!(actions, vec!["create", "add_members", "remove_members"]);
    }

    #[tokio::test]
    async fn test_member_edit_on_missing_resource() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;
        let user = ResourceRef::new(ResourceKind::IamUser, "ghost");

        let err = assert_err!(Mutator::<IamProfile, GroupId>::add_members(&cluster, &ctx(), &user, &groups(&["ops"])).await);
        assert!(matches!(
            err,
            ConvergeError::Mutation(MutationError {
                kind: MutationErrorKind::NotFound,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unresolved_members() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;
        let ops = ResourceRef::new(ResourceKind::IamGroup, "ops");
        let user = ResourceRef::new(ResourceKind::IamUser, "alice");

        assert_ok!(
            Mutator::<IamProfile, GroupId>::create(&cluster, &ctx(), &ops, &profile()).await
        );

        let unresolved = assert_ok!(
            StateProbe::<IamProfile, GroupId>::unresolved_members(
                &cluster,
                &ctx(),
                &user,
                &groups(&["ops", "missing"])
            )
            .await
        );
        assert_eq!(unresolved, groups(&["missing"]));
    }

    #[tokio::test]
    async fn test_wrong_cluster_is_unreachable() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cluster = open(&temp_dir).await;
        assert_ok!(create(&cluster, &app(), json!({})).await);

        let reopened = LocalCluster::open(cluster.path(), "staging")
            .await
            .expect("Failed to reopen");
        let err = assert_err!(
            StateProbe::<Value, NoMembers>::observe(
                &reopened,
                &ClusterContext::new("staging"),
                &app()
            )
            .await
        );
        assert!(matches!(err, ConvergeError::Unreachable { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("prod.json");
        std::fs::write(&path, "not json").expect("Failed to write");

        let err = assert_err!(LocalCluster::open(&path, "prod").await);
        assert!(matches!(
            err,
            ConvergeError::Cluster(ClusterError::Corrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("prod.json");
        let cluster = LocalCluster::open(&path, "prod").await.expect("Failed to open");

        assert_ok!(create(&cluster, &app(), json!({})).await);
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_default_path() {
        if let Ok(path) = LocalCluster::default_path("prod") {
            assert!(path.ends_with("dcos-converge/prod.json"));
        }
    }
}
