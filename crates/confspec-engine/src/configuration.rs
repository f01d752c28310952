//! Configuration documents
//!
//! [`Configuration`] wraps a parsed document with the dirty flag that tells
//! callers whether anything needs to be persisted.

use crate::apply::{ApplicationSummary, Pass};
use crate::error::ApplyError;
use crate::specification::Specification;
use confspec_document::{Content, Document, DocumentError, Element, ElementPath, QualifiedName, WriteOptions};
use tracing::info;

/// Node of a configuration tree
///
/// Configuration nodes carry no identity of their own; they are located
/// relative to a specification node each time one is applied.
pub type ConfigurationNode = Element;

/// Name of the virtual parent holding the document element during a pass
const DOCUMENT_HOLDER: &str = "#document";

/// Configuration document under change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    document: Document,
    dirty: bool,
}

impl Configuration {
    /// Wrap a parsed document
    #[inline]
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            document,
            dirty: false,
        }
    }

    /// Parse configuration text
    ///
    /// # Errors
    /// Returns `DocumentError` if the text is not well-formed XML
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        Document::parse(text).map(Self::new)
    }

    /// Underlying document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Document element
    #[inline]
    #[must_use]
    pub fn root(&self) -> &ConfigurationNode {
        self.document.root()
    }

    /// Whether any element or attribute was created, changed or removed
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Unwrap the document
    #[inline]
    #[must_use]
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Serialize with the given options
    ///
    /// # Errors
    /// Returns `DocumentError::Write` if the writer fails
    pub fn to_xml(&self, options: &WriteOptions) -> Result<String, DocumentError> {
        self.document.to_xml(options)
    }

    /// Apply a specification
    ///
    /// Works on a copy: `self` is untouched whether the pass succeeds or not.
    ///
    /// # Returns
    /// The changed configuration, the inverse specification and a summary
    ///
    /// # Errors
    /// Any [`ApplyError`] raised while matching or changing elements
    pub fn apply(&self, specification: &Specification) -> Result<ApplicationResult, ApplyError> {
        let (prolog, root, epilog) = self.document.clone().into_parts();
        let mut holder = Element::new(QualifiedName::local(DOCUMENT_HOLDER)).with_child(root);

        let mut pass = Pass::default();
        let mut inverse_roots = pass.apply_children(
            &mut holder,
            &ElementPath::root(),
            std::slice::from_ref(specification.root()),
            &ElementPath::root(),
        )?;

        let count = holder.child_element_count();
        let root = holder.content_mut().drain(..).find_map(|content| match content {
            Content::Element(element) => Some(element),
            _ => None,
        });
        let (Some(root), Some(inverse_root), 1) = (root, inverse_roots.drain(..).next(), count) else {
            return Err(ApplyError::RootConflict {
                specification: ElementPath::root().child(specification.root().name().clone(), None),
                count,
            });
        };

        let summary = pass.summary();
        info!(
            root = %root.name(),
            dirty = pass.is_dirty(),
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            "specification applied"
        );

        Ok(ApplicationResult {
            configuration: Self {
                document: Document::from_parts(prolog, root, epilog),
                dirty: self.dirty || pass.is_dirty(),
            },
            inverse: specification.with_root(inverse_root),
            summary,
        })
    }
}

impl std::str::FromStr for Configuration {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Outcome of [`Configuration::apply`]
#[derive(Debug, Clone)]
pub struct ApplicationResult {
    configuration: Configuration,
    inverse: Specification,
    summary: ApplicationSummary,
}

impl ApplicationResult {
    /// Changed configuration
    #[inline]
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Specification restoring the original configuration
    #[inline]
    #[must_use]
    pub fn inverse(&self) -> &Specification {
        &self.inverse
    }

    /// Per-operation counts
    #[inline]
    #[must_use]
    pub fn summary(&self) -> ApplicationSummary {
        self.summary
    }

    /// Whether the configuration needs persisting
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.configuration.is_dirty()
    }

    /// Split into configuration and inverse specification
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (Configuration, Specification) {
        (self.configuration, self.inverse)
    }
}
