//! Error types for reading and writing documents

use crate::name::NameError;

/// Errors raised by the XML codec
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Input is not well-formed XML
    #[error("malformed xml: {0}")]
    Malformed(#[from] roxmltree::Error),

    /// Input has no document element
    #[error("document has no root element")]
    MissingRoot,

    /// Writer failure
    #[error("failed to write xml: {0}")]
    Write(String),

    /// Written bytes are not UTF-8
    #[error("written xml is not utf-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Invalid name
    #[error("invalid name: {0}")]
    Name(#[from] NameError),
}

impl DocumentError {
    /// Create write error from any displayable cause
    pub fn write(cause: impl std::fmt::Display) -> Self {
        Self::Write(cause.to_string())
    }
}
