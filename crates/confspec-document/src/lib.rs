//! confspec XML Document Model
//!
//! Owned, namespace-aware XML trees shared by configurations and
//! specifications.
//!
//! # Core Concepts
//!
//! - [`QualifiedName`]: expanded (namespace URI, local name) pair, shown in Clark notation
//! - [`Element`]: ordered attributes unique by expanded name plus mixed [`Content`]
//! - [`Document`]: root element with surrounding comments and processing instructions
//! - [`ElementPath`]: absolute `/a/b[2]` address used in diagnostics
//! - [`Fingerprint`]: Blake3 digest used to detect concurrent file changes
//!
//! # Example
//!
//! ```rust
//! use confspec_document::{Document, QualifiedName, WriteOptions};
//!
//! let doc = Document::parse("<configuration><appSettings/></configuration>")?;
//! assert_eq!(doc.root().name(), &QualifiedName::local("configuration"));
//! let xml = doc.to_xml(&WriteOptions::compact())?;
//! assert!(xml.ends_with("<configuration><appSettings/></configuration>"));
//! # Ok::<(), confspec_document::DocumentError>(())
//! ```

#![warn(unreachable_pub)]

mod document;
mod element;
mod error;
mod hash;
mod name;
mod path;
mod reader;
mod writer;

pub use document::Document;
pub use element::{Attribute, Content, Element, NamespaceDeclaration, ProcessingInstruction};
pub use error::DocumentError;
pub use hash::{Fingerprint, FingerprintError};
pub use name::{NameError, QualifiedName, XMLNS_NAMESPACE, XML_NAMESPACE};
pub use path::{ElementPath, PathError, PathSegment};
pub use writer::WriteOptions;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
