//! confspec File Layer
//!
//! Applies specification files to the configuration files they name, keeping
//! a backup of each changed target and an undo specification beside the
//! specification file.
//!
//! # Core Concepts
//!
//! - [`MonikerResolver`]: turns `targetConfigurationFiles` monikers into paths
//! - [`ResolverRegistry`]: picks the resolver for each moniker by priority
//! - [`SpecificationProcessor`]: plans every target in memory, then commits
//! - [`ProcessReport`]: per-target outcome, serializable to JSON
//!
//! # Architecture
//!
//! ```text
//! spec.xml ─→ resolve monikers ─→ read + fingerprint targets ─→ apply (plan)
//!                                                                   │
//!   <target>.<token>.bak ←─ backup ←─ verify fingerprint ←─ commit ─┘
//!   <target>              ←─ write configuration
//!   spec.xml.<token>.undo ←─ write inverse specification
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use confspec_io::{ProcessorConfig, SpecificationProcessor};
//!
//! # async fn run() -> Result<(), confspec_io::ProcessError> {
//! let processor = SpecificationProcessor::with_config(ProcessorConfig::new().with_dry_run(true));
//! let report = processor.process_file("deploy/web.spec.xml").await?;
//! for target in &report.targets {
//!     println!("{}: {:?}", target.path.display(), target.status);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
pub mod error;
mod processor;
mod report;
pub mod resolver;

pub use config::ProcessorConfig;
pub use error::{ProcessError, ProcessResult};
pub use processor::{PlannedTarget, ProcessPlan, SpecificationProcessor};
pub use report::{ProcessReport, TargetReport, TargetStatus};
pub use resolver::{
    default_resolvers, FileMonikerResolver, MonikerResolver, PathMonikerResolver, ResolverRegistry,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for processing specification files
    pub use crate::config::ProcessorConfig;
    pub use crate::error::{ProcessError, ProcessResult};
    pub use crate::processor::SpecificationProcessor;
    pub use crate::report::{ProcessReport, TargetStatus};
    pub use crate::resolver::{MonikerResolver, ResolverRegistry};
}
