//! Processor settings

use crate::error::ProcessError;
use confspec_document::WriteOptions;
use serde::{Deserialize, Serialize};

/// Settings for [`SpecificationProcessor`](crate::SpecificationProcessor)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Copy each changed target to `<target>.<token>.bak` before writing it
    pub create_backup: bool,
    /// Write the inverse specification next to the specification file
    pub create_undo: bool,
    /// Apply in memory only; never write any file
    pub dry_run: bool,
    /// Maximum size of a specification or configuration file (bytes)
    pub max_document_size: usize,
    /// How changed configurations are serialized
    pub output: WriteOptions,
}

impl ProcessorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// Returns `ProcessError::Config` if the JSON does not describe settings
    pub fn from_json(json: &str) -> Result<Self, ProcessError> {
        Ok(serde_json::from_str(json)?)
    }

    /// With backup creation
    #[inline]
    #[must_use]
    pub fn with_backup(mut self, create_backup: bool) -> Self {
        self.create_backup = create_backup;
        self
    }

    /// With undo file creation
    #[inline]
    #[must_use]
    pub fn with_undo(mut self, create_undo: bool) -> Self {
        self.create_undo = create_undo;
        self
    }

    /// With dry run
    #[inline]
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// With maximum document size
    #[inline]
    #[must_use]
    pub fn with_max_document_size(mut self, max: usize) -> Self {
        self.max_document_size = max;
        self
    }

    /// With output format
    #[inline]
    #[must_use]
    pub fn with_output(mut self, output: WriteOptions) -> Self {
        self.output = output;
        self
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            create_backup: true,
            create_undo: true,
            dry_run: false,
            max_document_size: 10 * 1024 * 1024, // 10MB
            output: WriteOptions::compact(),
        }
    }
}
