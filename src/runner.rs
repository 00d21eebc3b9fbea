//! Manifest runner.
//!
//! Reconciles every declared resource against a cluster, in manifest order.
//! A failing resource is reported and the run moves on; nothing is rolled
//! back.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{error, info};

use crate::adapter::{PlannedChanges, PlannedProbe};
use crate::cluster::LocalCluster;
use crate::config::{Manifest, PayloadHasher, ResourceDecl};
use crate::error::Result;
use crate::model::{DesiredState, Member, ObservedState, Payload, ResourceRef};
use crate::planner::Action;
use crate::poller::{ConvergencePoller, RetryPolicy};
use crate::reconciler::{ConvergenceResult, ConvergenceStatus, Reconciler};
use crate::resources::KindSpec;
use crate::resources::iam::{IamGroup, IamResource, IamUser};
use crate::resources::marathon::{App, Group, Pod};
use crate::resources::package::{Package, PackageRepo};
use crate::resources::quota::Quota;
use crate::resources::secret::Secret;

/// Outcome of one resource in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Already in the desired state.
    Ok,
    /// Changed and confirmed.
    Changed,
    /// Would change; nothing was applied.
    WouldChange,
    /// Changed, but not yet confirmed when the retry budget ran out.
    Pending,
    /// Reconciliation failed.
    Failed,
}

impl ReportStatus {
    /// Returns true if the run should be considered unsuccessful.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Changed => write!(f, "changed"),
            Self::WouldChange => write!(f, "would change"),
            Self::Pending => write!(f, "pending"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl From<ConvergenceStatus> for ReportStatus {
    fn from(status: ConvergenceStatus) -> Self {
        match status {
            ConvergenceStatus::InSync => Self::Ok,
            ConvergenceStatus::Planned => Self::WouldChange,
            ConvergenceStatus::Converged => Self::Changed,
            ConvergenceStatus::TimedOut => Self::Pending,
        }
    }
}

/// Report for one declared resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    /// Resource that was reconciled.
    pub resource: ResourceRef,
    /// Outcome.
    pub status: ReportStatus,
    /// Planned actions; payloads appear as fingerprints.
    pub actions: Vec<String>,
    /// Backoff rounds spent polling.
    pub attempts: u32,
    /// Error message, for failed or pending resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Report for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Cluster the manifest was applied to.
    pub cluster: String,
    /// Whether the run only planned.
    pub dry_run: bool,
    /// Per-resource reports, in manifest order.
    pub resources: Vec<ResourceReport>,
}

impl RunReport {
    /// Returns the number of resources with the given status.
    #[must_use]
    pub fn count(&self, status: ReportStatus) -> usize {
        self.resources
            .iter()
            .filter(|report| report.status == status)
            .count()
    }

    /// Returns true if any resource failed or did not converge.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.resources.iter().any(|report| report.status.is_failure())
    }
}

/// Applies a manifest to a local cluster.
pub struct ManifestRunner<'a> {
    /// Manifest being applied.
    manifest: &'a Manifest,
    /// Cluster the manifest is applied to.
    cluster: &'a LocalCluster,
    /// Fingerprints payloads for reports.
    hasher: PayloadHasher,
    /// Compute plans without applying them.
    dry_run: bool,
}

impl<'a> ManifestRunner<'a> {
    /// Creates a runner; dry run follows the manifest defaults.
    #[must_use]
    pub const fn new(manifest: &'a Manifest, cluster: &'a LocalCluster) -> Self {
        Self {
            manifest,
            cluster,
            hasher: PayloadHasher::new(),
            dry_run: manifest.defaults.dry_run,
        }
    }

    /// Sets whether to stop after planning.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Reconciles every declared resource.
    ///
    /// # Errors
    ///
    /// Per-resource failures are recorded in the report. This only fails if
    /// the manifest's retry overrides are invalid.
    pub async fn run(&self) -> Result<RunReport> {
        let defaults = &self.manifest.defaults;
        // Reject bad overrides once, before touching any resource.
        RetryPolicy::fast().with_overrides(
            defaults.max_attempts,
            defaults.base_delay_ms.map(Duration::from_millis),
        )?;

        info!(
            "Reconciling {} resource(s) on {}{}",
            self.manifest.resources.len(),
            self.manifest.cluster,
            if self.dry_run { " (dry run)" } else { "" }
        );

        // Creations and deletions a dry run would have made by now.
        let mut planned = PlannedChanges::new();
        let mut resources = Vec::with_capacity(self.manifest.resources.len());
        for decl in &self.manifest.resources {
            let outcome = match decl {
                ResourceDecl::App(decl) => self.reconcile_kind::<App>(decl, &mut planned).await,
                ResourceDecl::Pod(decl) => self.reconcile_kind::<Pod>(decl, &mut planned).await,
                ResourceDecl::Group(decl) => self.reconcile_kind::<Group>(decl, &mut planned).await,
                ResourceDecl::Secret(decl) => {
                    self.reconcile_kind::<Secret>(decl, &mut planned).await
                }
                ResourceDecl::IamUser(decl) => {
                    self.reconcile_kind::<IamUser>(decl, &mut planned).await
                }
                ResourceDecl::IamGroup(decl) => {
                    self.reconcile_kind::<IamGroup>(decl, &mut planned).await
                }
                ResourceDecl::IamResource(decl) => {
                    self.reconcile_kind::<IamResource>(decl, &mut planned).await
                }
                ResourceDecl::Quota(decl) => self.reconcile_kind::<Quota>(decl, &mut planned).await,
                ResourceDecl::PackageRepo(decl) => {
                    self.reconcile_kind::<PackageRepo>(decl, &mut planned).await
                }
                ResourceDecl::Package(decl) => {
                    self.reconcile_kind::<Package>(decl, &mut planned).await
                }
            };

            let report = outcome.unwrap_or_else(|err| {
                let resource = decl.resource_ref();
                error!("{resource}: {err}");
                ResourceReport {
                    resource,
                    status: ReportStatus::Failed,
                    actions: Vec::new(),
                    attempts: 0,
                    error: Some(err.to_string()),
                }
            });
            resources.push(report);
        }

        let report = RunReport {
            cluster: self.manifest.cluster.name.clone(),
            dry_run: self.dry_run,
            resources,
        };
        info!(
            "Run finished: {} ok, {} changed, {} pending, {} failed",
            report.count(ReportStatus::Ok),
            report.count(ReportStatus::Changed) + report.count(ReportStatus::WouldChange),
            report.count(ReportStatus::Pending),
            report.count(ReportStatus::Failed)
        );
        Ok(report)
    }

    /// Reconciles one declaration.
    ///
    /// In a dry run, reference checks see the creations and deletions
    /// planned for earlier declarations, and this declaration's own plan is
    /// added to `planned`.
    async fn reconcile_kind<K: KindSpec>(
        &self,
        decl: &K::Decl,
        planned: &mut PlannedChanges,
    ) -> Result<ResourceReport> {
        let defaults = &self.manifest.defaults;
        let policy = K::KIND.default_policy().with_overrides(
            defaults.max_attempts,
            defaults.base_delay_ms.map(Duration::from_millis),
        )?;

        let resource = K::resource_ref(decl);
        let engine = K::diff_engine();
        let reconciler = Reconciler::new(
            &self.manifest.cluster,
            engine.clone(),
            ConvergencePoller::new(policy),
        )
        .with_dry_run(self.dry_run);

        let converge = |observed: &ObservedState<K::Payload, K::Member>,
                        desired: &DesiredState<K::Payload, K::Member>| {
            engine.matches(observed, desired)
        };
        let result = if self.dry_run {
            let probe = PlannedProbe::new(self.cluster, planned);
            reconciler
                .reconcile(&resource, K::desired(decl), &probe, self.cluster, converge)
                .await?
        } else {
            reconciler
                .reconcile(&resource, K::desired(decl), self.cluster, self.cluster, converge)
                .await?
        };

        if result.status == ConvergenceStatus::Planned {
            planned.record(&resource, &result.plan);
        }
        self.report(result)
    }

    fn report<P, M>(&self, result: ConvergenceResult<P, M>) -> Result<ResourceReport>
    where
        P: Payload + Serialize,
        M: Member,
    {
        let actions = result
            .plan
            .actions()
            .iter()
            .filter(|action| !matches!(action, Action::NoOp))
            .map(|action| self.describe(action))
            .collect::<Result<Vec<_>>>()?;

        let resource = result.resource.clone();
        let status = ReportStatus::from(result.status);
        let attempts = result.attempts;
        let error = result.into_result().err().map(|err| err.to_string());

        Ok(ResourceReport {
            resource,
            status,
            actions,
            attempts,
            error,
        })
    }

    /// Describes an action, replacing any payload by its fingerprint.
    fn describe<P: Serialize, M: fmt::Display>(&self, action: &Action<P, M>) -> Result<String> {
        match action.payload() {
            Some(payload) => {
                let fingerprint = self.hasher.fingerprint(payload)?;
                Ok(format!("{action} sha256:{}", self.hasher.short_hash(&fingerprint)))
            }
            None => Ok(action.to_string()),
        }
    }
}
