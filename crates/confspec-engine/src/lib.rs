//! confspec Engine
//!
//! Applies annotated XML specifications to configuration documents and
//! synthesizes, during the same pass, the inverse specification that undoes
//! the change.
//!
//! # Core Concepts
//!
//! - [`SpecificationNode`]: desired state of one element (operation, key and scrap names)
//! - [`Configuration`]: document under change plus its dirty flag
//! - [`ApplicationResult`]: changed configuration, inverse specification, summary
//! - **Satisfies**: name and key values match; used to locate a candidate
//! - **Equates**: full non-scrap attribute equality; decides whether change is needed
//!
//! # Architecture
//!
//! ```text
//! Specification ──┐
//!                 ├─→ Configuration::apply ─→ Configuration' + inverse Specification
//! Configuration ──┘
//!
//! Configuration' + inverse Specification ─→ Configuration (structurally)
//! ```
//!
//! # Example
//!
//! ```rust
//! use confspec_engine::{Configuration, Operation, Specification};
//!
//! let config = Configuration::parse("<configuration/>")?;
//! let spec = Specification::parse(
//!     "<configuration xmlns:config='urn:schemas.stateless.be:dsl:configuration:annotations:2020'>\
//!        <appSettings config:operation='insert'/>\
//!      </configuration>",
//! )?;
//!
//! let result = config.apply(&spec)?;
//! assert!(result.is_dirty());
//! assert_eq!(result.inverse().root().children()[0].operation(), Operation::Delete);
//!
//! let undone = result.configuration().apply(result.inverse())?;
//! assert!(undone.configuration().document().is_equivalent_to(config.document()));
//! # Ok::<(), confspec_engine::EngineError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod annotations;
mod apply;
mod configuration;
pub mod error;
mod specification;

pub use annotations::{Operation, ANNOTATION_NAMESPACE, ANNOTATION_PREFIX};
pub use apply::ApplicationSummary;
pub use configuration::{ApplicationResult, Configuration, ConfigurationNode};
pub use error::{ApplyError, EngineError, EngineResult, MatchError, SpecificationError};
pub use specification::{Specification, SpecificationNode};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for applying specifications
    pub use crate::annotations::Operation;
    pub use crate::configuration::{ApplicationResult, Configuration};
    pub use crate::error::{ApplyError, EngineError, SpecificationError};
    pub use crate::specification::{Specification, SpecificationNode};
    pub use confspec_document::{Document, Element, ElementPath, QualifiedName, WriteOptions};
}
