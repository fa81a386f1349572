//! Reader configuration.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ReaderError;

/// Reader session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Do not report columns missing from a source
    pub suppress_missing_column_errors: bool,
    /// Columns whose absence from a source is expected
    pub optional_columns: BTreeSet<String>,
    /// Report the first element-wise copy performed by each array reader
    pub warn_on_copy: bool,
    /// Number of diagnostics retained by the session log
    pub max_recorded_diagnostics: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            suppress_missing_column_errors: false,
            optional_columns: BTreeSet::new(),
            warn_on_copy: true,
            max_recorded_diagnostics: 256,
        }
    }
}

impl ReaderConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ReaderError> {
        serde_json::from_str(json).map_err(|e| ReaderError::Config(e.to_string()))
    }

    /// Loads a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReaderError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ReaderError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    /// Marks a column as optional.
    pub fn with_optional_column(mut self, column: impl Into<String>) -> Self {
        self.optional_columns.insert(column.into());
        self
    }

    /// Returns `true` if a missing `column` should not be reported.
    pub fn is_missing_suppressed(&self, column: &str) -> bool {
        self.suppress_missing_column_errors || self.optional_columns.contains(column)
    }
}
