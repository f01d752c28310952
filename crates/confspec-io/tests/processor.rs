//! File layer integration tests

use confspec_engine::{Configuration, Operation, Specification, ANNOTATION_NAMESPACE};
use confspec_io::{
    MonikerResolver, ProcessError, ProcessorConfig, ResolverRegistry, SpecificationProcessor, TargetStatus,
};
use confspec_test_utils::{annotated, init_tracing, read_file, targeting, write_file};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const WEB_CONFIG: &str = "<configuration><appSettings><add key='first' value='1'/></appSettings></configuration>";

const ADD_SECOND: &str = "<appSettings config:operation='none'><add key='second' value='2'/></appSettings>";

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn assert_same_configuration(actual: &str, expected: &str) {
    let actual = Configuration::parse(actual).unwrap();
    let expected = Configuration::parse(expected).unwrap();
    assert!(
        actual.document().is_equivalent_to(expected.document()),
        "configurations differ:\n{actual:?}\n{expected:?}"
    );
}

#[tokio::test]
async fn process_file_writes_target_backup_and_undo() {
    init_tracing();
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("file://web.config", ADD_SECOND));

    let report = SpecificationProcessor::new().process_file(&spec).await.unwrap();

    assert_eq!(report.targets.len(), 1);
    let outcome = &report.targets[0];
    assert_eq!(outcome.status, TargetStatus::Updated);
    assert_eq!(outcome.summary.inserted, 1);
    assert_eq!(outcome.path, target);

    assert_same_configuration(
        &read_file(&target),
        "<configuration><appSettings><add key='first' value='1'/><add key='second' value='2'/></appSettings></configuration>",
    );

    let backup = outcome.backup.as_ref().unwrap();
    assert_eq!(backup, &dir.path().join(format!("web.config.{}.bak", report.token)));
    assert_eq!(read_file(backup), WEB_CONFIG);

    let undo = outcome.undo.as_ref().unwrap();
    assert_eq!(undo, &dir.path().join(format!("web.spec.xml.{}.undo", report.token)));
    let inverse = Specification::parse(&read_file(undo)).unwrap();
    let absolute = std::fs::canonicalize(&target).unwrap();
    assert_eq!(inverse.target_monikers(), [format!("file://{}", absolute.display())]);
    assert_eq!(inverse.root().children()[0].children()[0].operation(), Operation::Delete);
}

#[tokio::test]
async fn undo_file_restores_target() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(
        dir.path(),
        "web.spec.xml",
        &targeting(
            "file://web.config",
            "<appSettings config:operation='none'>\
               <add key='first' value='one' config:key='key' config:operation='update'/>\
               <add key='second' value='2'/>\
             </appSettings>",
        ),
    );

    let processor = SpecificationProcessor::new();
    let report = processor.process_file(&spec).await.unwrap();
    let undo = report.targets[0].undo.clone().unwrap();

    let undone = processor.process_file(&undo).await.unwrap();
    assert_eq!(undone.targets[0].status, TargetStatus::Updated);
    assert_same_configuration(&read_file(&target), WEB_CONFIG);
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("web.config", ADD_SECOND));

    let processor = SpecificationProcessor::with_config(ProcessorConfig::new().with_dry_run(true));
    let report = processor.process_file(&spec).await.unwrap();

    assert!(report.dry_run);
    assert!(report.has_changes());
    assert_eq!(report.targets[0].status, TargetStatus::Skipped);
    assert_eq!(report.targets[0].summary.inserted, 1);
    assert_eq!(read_file(&target), WEB_CONFIG);
    assert_eq!(entries(dir.path()), 2);
}

#[tokio::test]
async fn unchanged_target_is_left_alone() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(
        dir.path(),
        "web.spec.xml",
        &targeting(
            "file://web.config",
            "<appSettings config:operation='none'><add key='first' value='1'/></appSettings>",
        ),
    );

    let report = SpecificationProcessor::new().process_file(&spec).await.unwrap();

    assert!(!report.has_changes());
    assert_eq!(report.targets[0].status, TargetStatus::Unchanged);
    assert!(report.targets[0].backup.is_none());
    assert!(report.targets[0].undo.is_none());
    assert_eq!(read_file(&target), WEB_CONFIG);
    assert_eq!(entries(dir.path()), 2);
}

#[tokio::test]
async fn backup_and_undo_can_be_disabled() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("web.config", ADD_SECOND));

    let config = ProcessorConfig::new().with_backup(false).with_undo(false);
    let report = SpecificationProcessor::with_config(config)
        .process_file(&spec)
        .await
        .unwrap();

    assert_eq!(report.targets[0].status, TargetStatus::Updated);
    assert!(report.targets[0].backup.is_none());
    assert!(report.targets[0].undo.is_none());
    assert_eq!(entries(dir.path()), 2);
}

#[tokio::test]
async fn declared_backup_file_is_used() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(
        dir.path(),
        "web.spec.xml",
        &format!(
            "<configuration xmlns:config='{ANNOTATION_NAMESPACE}' \
               config:targetConfigurationFiles='file://web.config' \
               config:backupConfigurationFile='web.config.orig'>{ADD_SECOND}</configuration>"
        ),
    );

    let config = ProcessorConfig::new().with_backup(false);
    let report = SpecificationProcessor::with_config(config)
        .process_file(&spec)
        .await
        .unwrap();

    let backup = dir.path().join("web.config.orig");
    assert_eq!(report.targets[0].backup, Some(backup.clone()));
    assert_eq!(read_file(&backup), WEB_CONFIG);
}

#[tokio::test]
async fn several_targets_get_numbered_undo_files() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.config", WEB_CONFIG);
    let b = write_file(dir.path(), "b.config", WEB_CONFIG);
    let spec = write_file(
        dir.path(),
        "web.spec.xml",
        &targeting("file://a.config|b.config|file://a.config", ADD_SECOND),
    );

    let report = SpecificationProcessor::new().process_file(&spec).await.unwrap();

    assert_eq!(report.targets.len(), 2);
    assert_eq!(report.updated().count(), 2);
    assert_eq!(report.total().inserted, 2);
    assert_eq!(report.targets[0].path, a);
    assert_eq!(report.targets[1].path, b);
    assert_eq!(
        report.targets[1].undo,
        Some(dir.path().join(format!("web.spec.xml.{}.2.undo", report.token)))
    );
}

#[tokio::test]
async fn failing_target_leaves_every_target_untouched() {
    let dir = tempdir().unwrap();
    let a = write_file(dir.path(), "a.config", WEB_CONFIG);
    let b = write_file(dir.path(), "b.config", "<configuration/>");
    let spec = write_file(
        dir.path(),
        "web.spec.xml",
        &targeting("a.config|b.config", "<appSettings config:operation='update'/>"),
    );

    let err = SpecificationProcessor::new().process_file(&spec).await.unwrap_err();

    assert!(matches!(err, ProcessError::Apply { ref path, .. } if path == &b));
    assert_eq!(read_file(&a), WEB_CONFIG);
    assert_eq!(read_file(&b), "<configuration/>");
    assert_eq!(entries(dir.path()), 3);
}

#[tokio::test]
async fn concurrent_change_aborts_commit() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("web.config", ADD_SECOND));

    let processor = SpecificationProcessor::new();
    let plan = processor.plan(&spec).await.unwrap();
    assert!(plan.is_dirty());
    assert_eq!(plan.targets()[0].path(), target.as_path());

    let edited = "<configuration><appSettings/></configuration>";
    write_file(dir.path(), "web.config", edited);

    let err = processor.commit(plan).await.unwrap_err();
    assert!(matches!(err, ProcessError::ConcurrentModification { .. }));
    assert_eq!(read_file(&target), edited);
    assert_eq!(entries(dir.path()), 2);
}

#[tokio::test]
async fn specification_without_targets_is_rejected() {
    let dir = tempdir().unwrap();
    let spec = write_file(dir.path(), "web.spec.xml", &annotated(ADD_SECOND));

    let err = SpecificationProcessor::new().process_file(&spec).await.unwrap_err();
    assert!(matches!(err, ProcessError::NoTargets(path) if path == spec));
}

#[tokio::test]
async fn unknown_moniker_scheme_is_rejected() {
    let dir = tempdir().unwrap();
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("ftp://host/web.config", ADD_SECOND));

    let err = SpecificationProcessor::new().process_file(&spec).await.unwrap_err();
    assert!(matches!(err, ProcessError::UnresolvedMoniker(m) if m == "ftp://host/web.config"));
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("web.config", ADD_SECOND));

    let config = ProcessorConfig::new().with_max_document_size(64);
    let err = SpecificationProcessor::with_config(config)
        .process_file(&spec)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessError::TooLarge { ref path, max: 64, .. } if path == &spec));
}

#[tokio::test]
async fn missing_target_reports_path() {
    let dir = tempdir().unwrap();
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("missing.config", ADD_SECOND));

    let err = SpecificationProcessor::new().process_file(&spec).await.unwrap_err();
    assert!(matches!(err, ProcessError::Io { ref path, .. } if path == &dir.path().join("missing.config")));
}

#[tokio::test]
async fn malformed_specification_reports_path() {
    let dir = tempdir().unwrap();
    let spec = write_file(dir.path(), "web.spec.xml", "<configuration>");

    let err = SpecificationProcessor::new().process_file(&spec).await.unwrap_err();
    assert!(matches!(err, ProcessError::Specification { ref path, .. } if path == &spec));
}

struct AliasResolver {
    root: PathBuf,
}

impl MonikerResolver for AliasResolver {
    fn name(&self) -> &'static str {
        "alias"
    }

    fn can_resolve(&self, moniker: &str) -> bool {
        moniker.starts_with("alias://")
    }

    fn resolve(&self, moniker: &str, _base: &Path) -> Result<Vec<PathBuf>, ProcessError> {
        let name = moniker.trim_start_matches("alias://");
        Ok(vec![self.root.join(format!("{name}.config"))])
    }
}

#[tokio::test]
async fn custom_resolver_is_selected_for_its_scheme() {
    let dir = tempdir().unwrap();
    let targets = tempdir().unwrap();
    let target = write_file(targets.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("alias://web", ADD_SECOND));

    let resolvers = ResolverRegistry::new().with(AliasResolver {
        root: targets.path().to_path_buf(),
    });
    let report = SpecificationProcessor::new()
        .with_resolvers(resolvers)
        .process_file(&spec)
        .await
        .unwrap();

    assert_eq!(report.targets[0].path, target);
    assert_eq!(report.targets[0].status, TargetStatus::Updated);
}

#[tokio::test]
async fn process_files_runs_in_order() {
    let dir = tempdir().unwrap();
    let target = write_file(dir.path(), "web.config", "<configuration/>");
    let first = write_file(dir.path(), "1.spec.xml", &targeting("web.config", "<appSettings/>"));
    let second = write_file(
        dir.path(),
        "2.spec.xml",
        &targeting("web.config", "<appSettings mode='on' config:key='' config:operation='update'/>"),
    );

    let processor = SpecificationProcessor::with_config(ProcessorConfig::new().with_undo(false));
    let reports = processor.process_files(&[first, second]).await.unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].targets[0].summary.inserted, 1);
    assert_eq!(reports[1].targets[0].summary.updated, 1);
    assert_same_configuration(&read_file(&target), "<configuration><appSettings mode='on'/></configuration>");
}

#[tokio::test]
async fn report_serializes_to_json() {
    let dir = tempdir().unwrap();
    write_file(dir.path(), "web.config", WEB_CONFIG);
    let spec = write_file(dir.path(), "web.spec.xml", &targeting("web.config", ADD_SECOND));

    let report = SpecificationProcessor::with_config(ProcessorConfig::new().with_dry_run(true))
        .process_file(&spec)
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["dry_run"], true);
    assert_eq!(json["targets"][0]["status"], "skipped");
    assert_eq!(json["targets"][0]["summary"]["inserted"], 1);
}
