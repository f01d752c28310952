//! Processing reports

use confspec_engine::ApplicationSummary;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one target file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    /// Configuration written
    Updated,
    /// Nothing to change; file left alone
    Unchanged,
    /// Changes found but not written (dry run)
    Skipped,
}

/// Outcome for one target configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetReport {
    /// Target configuration file
    pub path: PathBuf,
    /// What happened to it
    pub status: TargetStatus,
    /// Per-operation counts of the pass
    pub summary: ApplicationSummary,
    /// Fingerprint of the file as read
    pub fingerprint: String,
    /// Backup copy, when one was written
    pub backup: Option<PathBuf>,
    /// Undo specification, when one was written
    pub undo: Option<PathBuf>,
}

/// Outcome of processing one specification file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessReport {
    /// Specification file
    pub specification: PathBuf,
    /// Timestamp token used in backup and undo file names
    pub token: String,
    /// Whether writes were suppressed
    pub dry_run: bool,
    /// One entry per resolved target, in resolution order
    pub targets: Vec<TargetReport>,
}

impl ProcessReport {
    /// Whether any target had changes, written or not
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.targets
            .iter()
            .any(|t| t.status != TargetStatus::Unchanged)
    }

    /// Targets that were written
    pub fn updated(&self) -> impl Iterator<Item = &TargetReport> {
        self.targets
            .iter()
            .filter(|t| t.status == TargetStatus::Updated)
    }

    /// Summary over all targets
    #[must_use]
    pub fn total(&self) -> ApplicationSummary {
        self.targets
            .iter()
            .fold(ApplicationSummary::default(), |mut total, t| {
                total.inserted += t.summary.inserted;
                total.updated += t.summary.updated;
                total.deleted += t.summary.deleted;
                total.unchanged += t.summary.unchanged;
                total
            })
    }

    /// Serialize as pretty-printed JSON
    ///
    /// # Errors
    /// Returns `serde_json::Error` if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, status: TargetStatus, inserted: usize) -> TargetReport {
        TargetReport {
            path: PathBuf::from(name),
            status,
            summary: ApplicationSummary {
                inserted,
                ..ApplicationSummary::default()
            },
            fingerprint: "00".repeat(32),
            backup: None,
            undo: None,
        }
    }

    fn report(targets: Vec<TargetReport>) -> ProcessReport {
        ProcessReport {
            specification: PathBuf::from("spec.xml"),
            token: "20260101000000000000000".to_string(),
            dry_run: false,
            targets,
        }
    }

    #[test]
    fn unchanged_targets_have_no_changes() {
        let report = report(vec![target("a.config", TargetStatus::Unchanged, 0)]);
        assert!(!report.has_changes());
        assert_eq!(report.updated().count(), 0);
    }

    #[test]
    fn skipped_targets_count_as_changes() {
        let report = report(vec![target("a.config", TargetStatus::Skipped, 1)]);
        assert!(report.has_changes());
        assert_eq!(report.updated().count(), 0);
    }

    #[test]
    fn total_adds_up_targets() {
        let report = report(vec![
            target("a.config", TargetStatus::Updated, 2),
            target("b.config", TargetStatus::Updated, 3),
        ]);
        assert_eq!(report.total().inserted, 5);
        assert_eq!(report.updated().count(), 2);
    }

    #[test]
    fn json_uses_snake_case_status() {
        let json = report(vec![target("a.config", TargetStatus::Updated, 1)])
            .to_json()
            .unwrap();
        assert!(json.contains("\"status\": \"updated\""));
        assert!(json.contains("\"specification\": \"spec.xml\""));
    }
}
