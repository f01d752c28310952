//! Testing utilities for the confspec workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use confspec_document::{Document, WriteOptions};
use confspec_engine::{ApplicationResult, ApplyError, Configuration, Specification, ANNOTATION_NAMESPACE};
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Wrap specification children in an annotated `configuration` root
pub fn annotated(body: &str) -> String {
    format!("<configuration xmlns:config='{ANNOTATION_NAMESPACE}'>{body}</configuration>")
}

/// Like [`annotated`], with a `targetConfigurationFiles` annotation on the root
pub fn targeting(targets: &str, body: &str) -> String {
    format!(
        "<configuration xmlns:config='{ANNOTATION_NAMESPACE}' config:targetConfigurationFiles='{targets}'>{body}</configuration>"
    )
}

/// Write `content` to `dir/name`, returning the path
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
    path
}

/// Read a file written by the code under test
pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

pub fn configuration(text: &str) -> Configuration {
    Configuration::parse(text).unwrap_or_else(|e| panic!("invalid configuration: {e}\n{text}"))
}

pub fn specification(text: &str) -> Specification {
    Specification::parse(text).unwrap_or_else(|e| panic!("invalid specification: {e}\n{text}"))
}

pub fn document(text: &str) -> Document {
    Document::parse(text).unwrap_or_else(|e| panic!("invalid document: {e}\n{text}"))
}

pub fn apply(config: &str, spec: &str) -> Result<ApplicationResult, ApplyError> {
    configuration(config).apply(&specification(spec))
}

/// Compact XML rendering used to diff documents in assertion failures
pub fn render(document: &Document) -> String {
    document
        .to_xml(&WriteOptions::compact())
        .unwrap_or_else(|e| panic!("cannot write document: {e}"))
}

/// Assert structural equivalence, showing a diff of both documents on failure
#[track_caller]
pub fn assert_equivalent(actual: &Document, expected: &Document) {
    if !actual.is_equivalent_to(expected) {
        pretty_assertions::assert_eq!(render(actual), render(expected), "documents are not equivalent");
        panic!("documents are not equivalent although they render identically");
    }
}

/// Assert that applying the inverse of `result` to its configuration restores `original`
#[track_caller]
pub fn assert_round_trip(original: &Configuration, result: &ApplicationResult) {
    let restored = result
        .configuration()
        .apply(result.inverse())
        .unwrap_or_else(|e| panic!("inverse specification failed to apply: {e}"));
    assert_equivalent(restored.configuration().document(), original.document());
}

/// One scenario of specification application
#[derive(Debug, Clone, Copy)]
pub struct Case {
    pub name: &'static str,
    pub input: &'static str,
    pub forward: &'static str,
    /// Expected configuration; `None` when the pass must leave it unchanged
    pub output: Option<&'static str>,
    pub backward: &'static str,
}

impl Case {
    /// Apply `forward` to `input` and check output, dirty flag, inverse and round trip
    #[track_caller]
    pub fn verify(&self) {
        let input = configuration(self.input);
        let result = input
            .apply(&specification(self.forward))
            .unwrap_or_else(|e| panic!("{}: {e}", self.name));

        assert_eq!(result.is_dirty(), self.output.is_some(), "{}: dirty flag", self.name);
        let expected = self.output.map_or_else(|| input.document().clone(), document);
        assert_equivalent(result.configuration().document(), &expected);
        assert_equivalent(&result.inverse().to_document(), &document(self.backward));
        assert_round_trip(&input, &result);
    }
}

/// Install a test subscriber honouring `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
