//! End-to-end runs of a manifest against a local cluster file.

use dcos_converge::cluster::LocalCluster;
use dcos_converge::config::{Manifest, ManifestParser, ManifestValidator};
use dcos_converge::model::{ResourceKind, ResourceRef};
use dcos_converge::runner::{ManifestRunner, ReportStatus};
use tempfile::TempDir;

const SITE: &str = r#"
cluster:
  name: prod
defaults:
  base_delay_ms: 1
resources:
  - kind: iam_resource
    rid: "dcos:adminrouter:service:marathon"
  - kind: iam_group
    gid: ops
    description: Operators
    permissions:
      - { rid: "dcos:adminrouter:service:marathon", action: full }
  - kind: iam_user
    uid: alice
    groups: [ops]
  - kind: secret
    path: db/password
    value: hunter2
  - kind: quota
    role: dev
    cpu: 4
    mem: 8192
  - kind: package_repo
    name: universe
    url: https://universe.example/repo
  - kind: package
    name: kafka
    version: "2.3.0"
  - kind: app
    id: web
    definition:
      cpus: 0.5
      instances: 2
  - kind: group
    id: /infra
"#;

fn manifest(yaml: &str) -> Manifest {
    let manifest = ManifestParser::new()
        .parse_yaml(yaml, None)
        .expect("Failed to parse manifest");
    ManifestValidator::new()
        .validate(&manifest)
        .expect("Manifest should be valid");
    manifest
}

async fn open(temp_dir: &TempDir) -> LocalCluster {
    LocalCluster::open(temp_dir.path().join("prod.json"), "prod")
        .await
        .expect("Failed to open cluster")
}

#[tokio::test]
async fn test_apply_then_reapply_is_idempotent() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manifest = manifest(SITE);

    let cluster = open(&temp_dir).await;
    let first = ManifestRunner::new(&manifest, &cluster)
        .run()
        .await
        .expect("First run failed");

    assert!(!first.has_failures(), "{first:?}");
    assert_eq!(first.count(ReportStatus::Changed), manifest.resources.len());

    // A fresh handle reads everything back from disk.
    drop(cluster);
    let cluster = open(&temp_dir).await;
    let second = ManifestRunner::new(&manifest, &cluster)
        .run()
        .await
        .expect("Second run failed");

    assert_eq!(second.count(ReportStatus::Ok), manifest.resources.len());
    assert!(second.resources.iter().all(|report| report.actions.is_empty()));
    assert_eq!(
        cluster.snapshot().await.journal.len(),
        first
            .resources
            .iter()
            .map(|report| report.actions.len())
            .sum::<usize>()
    );
}

#[tokio::test]
async fn test_dry_run_leaves_cluster_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let manifest = manifest(SITE);
    let cluster = open(&temp_dir).await;

    let report = ManifestRunner::new(&manifest, &cluster)
        .with_dry_run(true)
        .run()
        .await
        .expect("Dry run failed");

    assert!(report.dry_run);
    assert_eq!(report.count(ReportStatus::WouldChange), manifest.resources.len());
    assert!(!cluster.path().exists());
    assert_eq!(cluster.snapshot().await.resource_count(), 0);
}

#[tokio::test]
async fn test_changed_declarations_are_updated_and_removed() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cluster = open(&temp_dir).await;

    ManifestRunner::new(&manifest(SITE), &cluster)
        .run()
        .await
        .expect("Initial run failed");

    let revised = manifest(
        r#"
cluster:
  name: prod
defaults:
  base_delay_ms: 1
resources:
  - kind: iam_resource
    rid: "dcos:adminrouter:service:marathon"
  - kind: iam_group
    gid: ops
    description: Operators
    permissions: []
  - kind: iam_user
    uid: alice
    groups: []
  - kind: quota
    role: dev
    cpu: 8
  - kind: app
    id: /web
    state: absent
"#,
    );

    let report = ManifestRunner::new(&revised, &cluster)
        .run()
        .await
        .expect("Revised run failed");

    assert!(!report.has_failures(), "{report:?}");
    let actions: Vec<&[String]> = report
        .resources
        .iter()
        .map(|r| r.actions.as_slice())
        .collect();
    assert!(actions[0].is_empty());
    assert_eq!(
        actions[1],
        ["remove_members [full on dcos:adminrouter:service:marathon]".to_string()]
    );
    assert_eq!(actions[2], ["remove_members [ops]".to_string()]);
    assert!(actions[3][0].starts_with("update sha256:"));
    assert_eq!(actions[4], ["delete".to_string()]);

    let snapshot = cluster.snapshot().await;
    assert!(!snapshot.contains(&ResourceRef::new(ResourceKind::App, "/web")));
    // Resources no longer declared are left alone.
    assert!(snapshot.contains(&ResourceRef::new(ResourceKind::Package, "kafka")));
}
