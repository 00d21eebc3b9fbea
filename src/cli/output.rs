//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::cluster::ClusterSnapshot;
use crate::config::{Manifest, PayloadHasher, ValidationResult};
use crate::runner::{ReportStatus, RunReport};

use super::commands::OutputFormat;

/// Number of journal entries shown by `show`.
const RECENT_JOURNAL: usize = 5;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource outcome row for table display.
#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Actions")]
    actions: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
}

/// Stored resource row for table display.
#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Members")]
    members: String,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a run report for display.
    #[must_use]
    pub fn format_report(&self, report: &RunReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats a run report as text.
    fn format_report_text(report: &RunReport) -> String {
        let mut output = String::new();
        let mode = if report.dry_run { " (dry run)" } else { "" };
        let _ = writeln!(output, "\nCluster: {}{mode}\n", report.cluster.bold());

        if report.resources.is_empty() {
            output.push_str("   No resources declared.\n");
            return output;
        }

        let rows: Vec<ReportRow> = report
            .resources
            .iter()
            .map(|r| ReportRow {
                resource: r.resource.to_string(),
                status: Self::format_status(r.status),
                actions: if r.actions.is_empty() {
                    "-".to_string()
                } else {
                    Self::truncate(&r.actions.join("; "), 60)
                },
                attempts: r.attempts,
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let changed = if report.dry_run {
            report.count(ReportStatus::WouldChange)
        } else {
            report.count(ReportStatus::Changed)
        };
        let _ = writeln!(
            output,
            "\nRun: {} ok, {} {}, {} pending, {} failed",
            report.count(ReportStatus::Ok).to_string().green(),
            changed.to_string().yellow(),
            if report.dry_run { "to change" } else { "changed" },
            report.count(ReportStatus::Pending).to_string().yellow(),
            report.count(ReportStatus::Failed).to_string().red()
        );

        let errors: Vec<_> = report
            .resources
            .iter()
            .filter_map(|r| r.error.as_ref().map(|error| (&r.resource, error)))
            .collect();
        if !errors.is_empty() {
            let _ = write!(output, "\n{} Errors:\n", "✗".red());
            for (resource, error) in errors {
                let _ = writeln!(output, "   - {resource}: {error}");
            }
        }

        output
    }

    /// Formats a cluster snapshot.
    ///
    /// Payloads are shown as fingerprints only.
    #[must_use]
    pub fn format_snapshot(&self, snapshot: &ClusterSnapshot) -> String {
        let hasher = PayloadHasher::new();

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&SnapshotJson::new(snapshot, hasher))
                    .unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = String::new();

                let _ = write!(output, "\nCluster: {}\n\n", snapshot.cluster.bold());
                let _ = writeln!(output, "   Version: {}", snapshot.version);
                let _ = writeln!(output, "   Last updated: {}", snapshot.updated_at);
                let _ = writeln!(output, "   Resources: {}", snapshot.resource_count());

                if snapshot.resource_count() > 0 {
                    let rows: Vec<SnapshotRow> = snapshot
                        .entries()
                        .map(|(kind, id, stored)| SnapshotRow {
                            kind: kind.to_string(),
                            id: Self::truncate(id, 40),
                            members: stored
                                .member_count()
                                .map_or_else(|| "-".to_string(), |count| count.to_string()),
                            fingerprint: Self::fingerprint(hasher, &stored.payload),
                        })
                        .collect();

                    output.push('\n');
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                if !snapshot.journal.is_empty() {
                    let _ = writeln!(output, "\n   Recent changes ({}):", snapshot.journal.len());
                    for entry in snapshot.journal.iter().rev().take(RECENT_JOURNAL) {
                        let _ = writeln!(
                            output,
                            "     {} {} {}",
                            entry.timestamp.format("%Y-%m-%d %H:%M"),
                            entry.action,
                            entry.resource
                        );
                    }
                }

                output
            }
        }
    }

    /// Formats the result of validating a manifest.
    #[must_use]
    pub fn format_validation(&self, manifest: &Manifest, result: &ValidationResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.errors.is_empty(),
                    "cluster": manifest.cluster.name,
                    "resources": manifest.resources.len(),
                    "warnings": result.warnings,
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = format!("{} Manifest is valid!\n", "✓".green());

                let _ = writeln!(output, "\nManifest summary:");
                let _ = writeln!(output, "  Cluster: {}", manifest.cluster);
                let _ = writeln!(output, "  Resources: {}", manifest.resources.len());
                if manifest.defaults.dry_run {
                    let _ = writeln!(output, "  Dry run: enabled");
                }

                if !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  - {warning}");
                    }
                }

                output
            }
        }
    }

    /// Formats a report status with color.
    fn format_status(status: ReportStatus) -> String {
        match status {
            ReportStatus::Ok => "ok".green().to_string(),
            ReportStatus::Changed => "changed".yellow().to_string(),
            ReportStatus::WouldChange => "would change".cyan().to_string(),
            ReportStatus::Pending => "pending".yellow().to_string(),
            ReportStatus::Failed => "failed".red().to_string(),
        }
    }

    fn fingerprint(hasher: PayloadHasher, payload: &serde_json::Value) -> String {
        hasher
            .fingerprint(payload)
            .map_or_else(|_| "?".to_string(), |hash| hasher.short_hash(&hash))
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct SnapshotJson<'a> {
    version: &'a str,
    cluster: &'a str,
    updated_at: String,
    resources: Vec<StoredJson<'a>>,
    journal: &'a [crate::cluster::JournalEntry],
}

#[derive(Serialize)]
struct StoredJson<'a> {
    kind: &'a str,
    id: &'a str,
    fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    members: Option<usize>,
}

impl<'a> SnapshotJson<'a> {
    fn new(snapshot: &'a ClusterSnapshot, hasher: PayloadHasher) -> Self {
        Self {
            version: &snapshot.version,
            cluster: &snapshot.cluster,
            updated_at: snapshot.updated_at.to_rfc3339(),
            resources: snapshot
                .entries()
                .map(|(kind, id, stored)| StoredJson {
                    kind,
                    id,
                    fingerprint: OutputFormatter::fingerprint(hasher, &stored.payload),
                    members: stored.member_count(),
                })
                .collect(),
            journal: &snapshot.journal,
        }
    }
}
