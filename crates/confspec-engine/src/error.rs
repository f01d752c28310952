//! Error types for the engine
//!
//! Provides error handling for:
//! - Reading specifications (annotation parsing)
//! - Applying specifications (matching and conflicts)

use confspec_document::{DocumentError, ElementPath, NameError, QualifiedName};

/// Errors raised while reading a specification document
#[derive(Debug, thiserror::Error)]
pub enum SpecificationError {
    /// Underlying document could not be read
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Operation annotation outside the legal set
    #[error("specification element '{path}' has an invalid operation annotation value '{value}'")]
    InvalidOperation { path: ElementPath, value: String },

    /// Prefixed name in a name list uses an undeclared prefix
    #[error("specification element '{path}' uses undeclared namespace prefix '{prefix}'")]
    UnknownPrefix { path: ElementPath, prefix: String },

    /// Malformed name in a name list
    #[error("specification element '{path}' has an invalid attribute name list: {source}")]
    InvalidName {
        path: ElementPath,
        #[source]
        source: NameError,
    },
}

/// Errors raised by a matching predicate
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// Key name not among the node's own attributes
    #[error("key attribute '{0}' is not an attribute of the specification element")]
    UndeclaredKey(QualifiedName),
}

/// Errors during specification application
///
/// Every variant names the specification element being applied and, where
/// one was located, the configuration element it was applied against.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// More than one configuration child satisfies a specification element
    #[error(
        "configuration element '{configuration}' contains more than one child configuration elements matching specification '{specification}'"
    )]
    AmbiguousMatch {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// `update` without a satisfying configuration element
    #[error(
        "cannot find a configuration element to update that corresponds to specification '{specification}'"
    )]
    MissingUpdateTarget { specification: ElementPath },

    /// `insert` located an element that does not equate
    #[error(
        "cannot insert configuration element '{configuration}' corresponding to specification '{specification}' because it conflicts with an existing one"
    )]
    InsertConflict {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// `delete` located an element that does not equate
    #[error(
        "cannot delete configuration element '{configuration}' corresponding to specification '{specification}' because it conflicts with specification"
    )]
    DeleteConflict {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// Live scrap attribute value differs from the specified one
    #[error(
        "cannot scrap attributes of configuration element '{configuration}' corresponding to specification '{specification}' because they conflict with specification ones"
    )]
    ScrapConflict {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// Declared key name missing from the specification element
    #[error(
        "specification attribute '{name}' was not found among the attributes of the specification element '{specification}' although it was specified as a key attribute"
    )]
    UndeclaredKey {
        specification: ElementPath,
        name: QualifiedName,
    },

    /// Declared scrap name missing from the specification element
    #[error(
        "specification attribute '{name}' was not found among the attributes of the specification element '{specification}' although it was specified as a scrap attribute"
    )]
    UndeclaredScrap {
        specification: ElementPath,
        name: QualifiedName,
    },

    /// Reinsertion anchor of a deleted element matches several siblings
    #[error(
        "cannot delete the element corresponding to specification '{specification}' from configuration element '{configuration}' because the sibling following it cannot be told apart from the others"
    )]
    AmbiguousAnchor {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// Deleted subtree holds siblings a restoring specification would merge
    #[error(
        "cannot delete the subtree corresponding to specification '{specification}' because configuration element '{configuration}' cannot be told apart from a following sibling"
    )]
    IndistinguishableChildren {
        configuration: ElementPath,
        specification: ElementPath,
    },

    /// Pass would not leave exactly one document element
    #[error(
        "applying specification '{specification}' would leave {count} document elements instead of one"
    )]
    RootConflict {
        specification: ElementPath,
        count: usize,
    },
}

impl ApplyError {
    /// Path of the specification element the error was raised for
    #[must_use]
    pub fn specification_path(&self) -> &ElementPath {
        match self {
            Self::AmbiguousMatch { specification, .. }
            | Self::MissingUpdateTarget { specification }
            | Self::InsertConflict { specification, .. }
            | Self::DeleteConflict { specification, .. }
            | Self::ScrapConflict { specification, .. }
            | Self::UndeclaredKey { specification, .. }
            | Self::UndeclaredScrap { specification, .. }
            | Self::AmbiguousAnchor { specification, .. }
            | Self::IndistinguishableChildren { specification, .. }
            | Self::RootConflict { specification, .. } => specification,
        }
    }

    pub(crate) fn from_match(error: MatchError, specification: &ElementPath) -> Self {
        match error {
            MatchError::UndeclaredKey(name) => Self::UndeclaredKey {
                specification: specification.clone(),
                name,
            },
        }
    }
}

/// Combined engine error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Document error
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Specification error
    #[error("specification error: {0}")]
    Specification(#[from] SpecificationError),

    /// Apply error
    #[error("apply error: {0}")]
    Apply(#[from] ApplyError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
