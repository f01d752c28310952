//! Error types for the file layer
//!
//! Provides error handling for:
//! - Reading specification and configuration files (ingress)
//! - Resolving target monikers
//! - Writing backups, configurations and undo files (egress)

use confspec_document::{DocumentError, Fingerprint};
use confspec_engine::{ApplyError, SpecificationError};
use std::path::PathBuf;

/// Errors raised while processing specification files
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// IO error reading or writing a file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not well-formed
    #[error("invalid configuration {path}: {source}")]
    Document {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },

    /// Specification file could not be read
    #[error("invalid specification {path}: {source}")]
    Specification {
        path: PathBuf,
        #[source]
        source: SpecificationError,
    },

    /// Specification could not be applied to a target
    #[error("cannot apply specification to {path}: {source}")]
    Apply {
        path: PathBuf,
        #[source]
        source: ApplyError,
    },

    /// No registered resolver accepts the moniker
    #[error("no resolver accepts moniker: '{0}'")]
    UnresolvedMoniker(String),

    /// Specification names no target configuration file
    #[error("specification {0} declares no target configuration files")]
    NoTargets(PathBuf),

    /// File exceeds the configured size limit
    #[error("file too large: {path} is {size} bytes (max: {max})")]
    TooLarge { path: PathBuf, size: usize, max: usize },

    /// Target changed between reading and writing it
    #[error("{path} was modified concurrently: expected {expected}, found {actual}")]
    ConcurrentModification {
        path: PathBuf,
        expected: Fingerprint,
        actual: Fingerprint,
    },

    /// Processor settings could not be read
    #[error("invalid processor configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ProcessError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create document error for path
    pub fn document(path: impl Into<PathBuf>, source: DocumentError) -> Self {
        Self::Document {
            path: path.into(),
            source,
        }
    }

    /// Create specification error for path
    pub fn specification(path: impl Into<PathBuf>, source: SpecificationError) -> Self {
        Self::Specification {
            path: path.into(),
            source,
        }
    }

    /// Create apply error for a target path
    pub fn apply(path: impl Into<PathBuf>, source: ApplyError) -> Self {
        Self::Apply {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for file layer operations
pub type ProcessResult<T> = Result<T, ProcessError>;
