//! Whole XML documents

use crate::element::{Content, Element};
use crate::error::DocumentError;
use crate::writer::WriteOptions;

/// XML document: the root element plus the comments and processing
/// instructions around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    prolog: Vec<Content>,
    root: Element,
    epilog: Vec<Content>,
}

impl Document {
    /// Create document around a root element
    #[inline]
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self::from_parts(Vec::new(), root, Vec::new())
    }

    /// Assemble document from its parts
    #[inline]
    #[must_use]
    pub fn from_parts(prolog: Vec<Content>, root: Element, epilog: Vec<Content>) -> Self {
        Self {
            prolog,
            root,
            epilog,
        }
    }

    /// Split document into prolog, root and epilog
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (Vec<Content>, Element, Vec<Content>) {
        (self.prolog, self.root, self.epilog)
    }

    /// Parse document text
    ///
    /// # Errors
    /// - `DocumentError::Malformed` if the text is not well-formed XML
    /// - `DocumentError::MissingRoot` if there is no document element
    #[inline]
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        crate::reader::parse(text)
    }

    /// Serialize document
    ///
    /// # Errors
    /// Returns `DocumentError::Write` if the writer fails
    #[inline]
    pub fn to_xml(&self, options: &WriteOptions) -> Result<String, DocumentError> {
        crate::writer::write(self, options)
    }

    /// Document element
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Document element, mutable
    #[inline]
    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// Comments and processing instructions before the root
    #[inline]
    #[must_use]
    pub fn prolog(&self) -> &[Content] {
        &self.prolog
    }

    /// Comments and processing instructions after the root
    #[inline]
    #[must_use]
    pub fn epilog(&self) -> &[Content] {
        &self.epilog
    }

    /// Structural equivalence of the document elements
    #[inline]
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.root.is_equivalent_to(&other.root)
    }
}

impl std::str::FromStr for Document {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
