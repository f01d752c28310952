//! Specification processor - file layer entry point
//!
//! Provides the boundary between the engine and the file system:
//! - Specification → resolved target paths (ingress)
//! - In-memory application against every target (plan)
//! - Backup, configuration and undo files (egress)

use crate::config::ProcessorConfig;
use crate::error::ProcessError;
use crate::report::{ProcessReport, TargetReport, TargetStatus};
use crate::resolver::ResolverRegistry;
use chrono::{DateTime, Utc};
use confspec_document::Fingerprint;
use confspec_engine::{ApplicationResult, Configuration, Specification};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One target applied in memory, not yet written
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    path: PathBuf,
    fingerprint: Fingerprint,
    result: ApplicationResult,
}

impl PlannedTarget {
    /// Target configuration file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fingerprint of the file as read
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Outcome of the in-memory pass
    #[inline]
    #[must_use]
    pub fn result(&self) -> &ApplicationResult {
        &self.result
    }
}

/// Every target of one specification applied in memory
///
/// Produced by [`SpecificationProcessor::plan`]; nothing has been written
/// yet. [`SpecificationProcessor::commit`] persists it.
#[derive(Debug, Clone)]
pub struct ProcessPlan {
    specification: PathBuf,
    backup_file: Option<PathBuf>,
    token: String,
    targets: Vec<PlannedTarget>,
}

impl ProcessPlan {
    /// Specification file the plan was built from
    #[inline]
    #[must_use]
    pub fn specification(&self) -> &Path {
        &self.specification
    }

    /// Timestamp token used in backup and undo file names
    #[inline]
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Planned targets, in resolution order
    #[inline]
    #[must_use]
    pub fn targets(&self) -> &[PlannedTarget] {
        &self.targets
    }

    /// Whether any target needs writing
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.targets.iter().any(|t| t.result.is_dirty())
    }
}

/// Applies specification files to the configuration files they target
///
/// This is the only component touching the file system. Every target is
/// applied in memory before the first one is written, so a specification
/// that fails on any target leaves all of them untouched.
#[derive(Debug, Default)]
pub struct SpecificationProcessor {
    config: ProcessorConfig,
    resolvers: ResolverRegistry,
}

impl SpecificationProcessor {
    /// Create processor with default settings and resolvers
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    /// Create processor with specific settings
    #[inline]
    #[must_use]
    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            resolvers: ResolverRegistry::default(),
        }
    }

    /// Builder: replace the moniker resolvers
    #[inline]
    #[must_use]
    pub fn with_resolvers(mut self, resolvers: ResolverRegistry) -> Self {
        self.resolvers = resolvers;
        self
    }

    /// Active settings
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Plan and commit a specification file
    ///
    /// # Arguments
    /// * `specification` - Path of the specification file
    ///
    /// # Returns
    /// Per-target report
    ///
    /// # Errors
    /// Any error from [`plan`](Self::plan) or [`commit`](Self::commit)
    pub async fn process_file(
        &self,
        specification: impl AsRef<Path>,
    ) -> Result<ProcessReport, ProcessError> {
        let plan = self.plan(specification).await?;
        self.commit(plan).await
    }

    /// Process several specification files in order
    ///
    /// # Errors
    /// Stops at the first specification that fails
    pub async fn process_files<P: AsRef<Path>>(
        &self,
        specifications: &[P],
    ) -> Result<Vec<ProcessReport>, ProcessError> {
        let mut reports = Vec::with_capacity(specifications.len());
        for specification in specifications {
            reports.push(self.process_file(specification).await?);
        }
        Ok(reports)
    }

    /// Load a specification and apply it to every target in memory
    ///
    /// # Errors
    /// - `ProcessError::Io` / `ProcessError::TooLarge` if a file cannot be read
    /// - `ProcessError::Specification` if the specification is invalid
    /// - `ProcessError::UnresolvedMoniker` / `ProcessError::NoTargets` if targets cannot be resolved
    /// - `ProcessError::Document` / `ProcessError::Apply` if a target cannot be changed
    pub async fn plan(&self, specification: impl AsRef<Path>) -> Result<ProcessPlan, ProcessError> {
        let spec_path = specification.as_ref();
        let (text, _) = self.read(spec_path).await?;
        let specification =
            Specification::parse(&text).map_err(|e| ProcessError::specification(spec_path, e))?;

        let base = spec_path.parent().unwrap_or_else(|| Path::new(""));
        let paths = self
            .resolvers
            .resolve_all(specification.target_monikers(), base)?;
        if paths.is_empty() {
            return Err(ProcessError::NoTargets(spec_path.to_path_buf()));
        }

        let mut targets = Vec::with_capacity(paths.len());
        for path in paths {
            let (text, fingerprint) = self.read(&path).await?;
            let configuration =
                Configuration::parse(&text).map_err(|e| ProcessError::document(&path, e))?;
            let result = configuration
                .apply(&specification)
                .map_err(|e| ProcessError::apply(&path, e))?;
            debug!(
                path = %path.display(),
                fingerprint = %fingerprint.short(),
                dirty = result.is_dirty(),
                "target planned"
            );
            targets.push(PlannedTarget {
                path,
                fingerprint,
                result,
            });
        }

        Ok(ProcessPlan {
            specification: spec_path.to_path_buf(),
            backup_file: specification.backup_file().map(|p| base.join(p)),
            token: token(Utc::now()),
            targets,
        })
    }

    /// Persist a plan
    ///
    /// Unchanged targets are left alone. In a dry run nothing is written.
    /// Otherwise each changed target is checked against its fingerprint,
    /// backed up, rewritten, and its inverse specification saved.
    ///
    /// # Errors
    /// - `ProcessError::ConcurrentModification` if a target changed since it was planned
    /// - `ProcessError::Io` if a backup, target or undo file cannot be written
    pub async fn commit(&self, plan: ProcessPlan) -> Result<ProcessReport, ProcessError> {
        let ProcessPlan {
            specification,
            backup_file,
            token,
            targets,
        } = plan;
        let count = targets.len();
        let mut reports = Vec::with_capacity(count);

        for (index, target) in targets.into_iter().enumerate() {
            let mut report = TargetReport {
                path: target.path.clone(),
                status: TargetStatus::Unchanged,
                summary: target.result.summary(),
                fingerprint: target.fingerprint.to_string(),
                backup: None,
                undo: None,
            };

            if !target.result.is_dirty() {
                warn!(path = %target.path.display(), "target already satisfies specification");
            } else if self.config.dry_run {
                warn!(
                    path = %target.path.display(),
                    changes = report.summary.changes(),
                    "dry run, target not written"
                );
                report.status = TargetStatus::Skipped;
            } else {
                let backup = match (&backup_file, count) {
                    (Some(declared), 1) => Some(declared.clone()),
                    (declared, _) if self.config.create_backup || declared.is_some() => {
                        Some(suffixed(&target.path, &format!("{token}.bak")))
                    }
                    _ => None,
                };
                let undo = self.config.create_undo.then(|| match count {
                    1 => suffixed(&specification, &format!("{token}.undo")),
                    _ => suffixed(&specification, &format!("{token}.{}.undo", index + 1)),
                });

                self.write_target(target, backup.as_deref(), undo.as_deref())
                    .await?;
                report.status = TargetStatus::Updated;
                report.backup = backup;
                report.undo = undo;
            }
            reports.push(report);
        }

        Ok(ProcessReport {
            specification,
            token,
            dry_run: self.config.dry_run,
            targets: reports,
        })
    }

    async fn write_target(
        &self,
        target: PlannedTarget,
        backup: Option<&Path>,
        undo: Option<&Path>,
    ) -> Result<(), ProcessError> {
        let PlannedTarget {
            path,
            fingerprint,
            result,
        } = target;

        let current = tokio::fs::read(&path)
            .await
            .map_err(|e| ProcessError::io_error(&path, e))?;
        let actual = Fingerprint::compute(&current);
        if actual != fingerprint {
            return Err(ProcessError::ConcurrentModification {
                path,
                expected: fingerprint,
                actual,
            });
        }

        if let Some(backup) = backup {
            tokio::fs::copy(&path, backup)
                .await
                .map_err(|e| ProcessError::io_error(backup, e))?;
        }

        let summary = result.summary();
        let (configuration, inverse) = result.into_parts();
        let xml = configuration
            .to_xml(&self.config.output)
            .map_err(|e| ProcessError::document(&path, e))?;
        tokio::fs::write(&path, xml)
            .await
            .map_err(|e| ProcessError::io_error(&path, e))?;

        if let Some(undo) = undo {
            // the undo file targets exactly this file, wherever it is read from
            let absolute = tokio::fs::canonicalize(&path)
                .await
                .map_err(|e| ProcessError::io_error(&path, e))?;
            let inverse = inverse
                .with_target_monikers(vec![format!("file://{}", absolute.display())])
                .with_backup_file(None);
            let xml = inverse
                .to_xml()
                .map_err(|e| ProcessError::document(undo, e))?;
            tokio::fs::write(undo, xml)
                .await
                .map_err(|e| ProcessError::io_error(undo, e))?;
        }

        info!(
            path = %path.display(),
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            backup = ?backup,
            undo = ?undo,
            "target updated"
        );
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<(String, Fingerprint), ProcessError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ProcessError::io_error(path, e))?;

        if content.len() > self.config.max_document_size {
            return Err(ProcessError::TooLarge {
                path: path.to_path_buf(),
                size: content.len(),
                max: self.config.max_document_size,
            });
        }

        let fingerprint = Fingerprint::compute(content.as_bytes());
        Ok((content, fingerprint))
    }
}

/// Timestamp token for backup and undo file names
fn token(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S%f").to_string()
}

/// `path` with `.suffix` appended to its file name
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_is_sortable_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(token(at), "20260102030405000000000");
        let later = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 6).unwrap();
        assert!(token(later) > token(at));
    }

    #[test]
    fn suffixed_appends_to_file_name() {
        assert_eq!(
            suffixed(Path::new("/etc/app/web.config"), "20260102.bak"),
            PathBuf::from("/etc/app/web.config.20260102.bak")
        );
        assert_eq!(suffixed(Path::new("spec.xml"), "1.undo"), PathBuf::from("spec.xml.1.undo"));
    }

    #[test]
    fn plan_reports_missing_specification() {
        let processor = SpecificationProcessor::new();
        let err = tokio_test::block_on(processor.plan("does-not-exist.spec.xml")).unwrap_err();
        assert!(matches!(err, ProcessError::Io { ref path, .. } if path == Path::new("does-not-exist.spec.xml")));
    }

    #[test]
    fn default_processor_uses_builtin_resolvers() {
        let processor = SpecificationProcessor::new();
        assert!(processor.config().create_undo);
        assert!(format!("{processor:?}").contains("file"));
    }
}
