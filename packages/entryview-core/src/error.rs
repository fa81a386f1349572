//! Reader, source and bounds error types.

use thiserror::Error;

use crate::diagnostics::DiagnosticKind;

/// Column access errors.
///
/// Every variant names the column path it concerns. Only
/// [`ReaderError::TypeMismatch`] is returned to callers of a reader's `get`;
/// the other variants are recovered locally and recorded as diagnostics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReaderError {
    /// Column absent from the current source schema
    #[error("Column '{column}' is not available from source '{source_name}'")]
    MissingColumn { column: String, source_name: String },

    /// Data member absent from the resolved class
    #[error("Data member '{member}' of column '{column}' seems no longer to be in class '{class}'")]
    MissingMember {
        column: String,
        member: String,
        class: String,
    },

    /// Class or element type unknown to the type catalog
    #[error("Class '{class}' for column '{column}' is unknown to the type catalog")]
    UnknownClass { column: String, class: String },

    /// Source reported a read failure for one entry
    #[error("Read error for column '{column}' at entry {entry} in source '{source_name}': {reason}")]
    ReadError {
        column: String,
        entry: u64,
        source_name: String,
        reason: String,
    },

    /// Requested typed view does not match the resolved column
    #[error("Type mismatch for column '{column}': expected {expected}, got {got}")]
    TypeMismatch {
        column: String,
        expected: String,
        got: String,
    },

    /// Negative or out-of-range member offset
    #[error("Invalid offset {offset} for column '{column}' (max: {max})")]
    InvalidOffset {
        column: String,
        offset: i64,
        max: usize,
    },

    /// Layout the access path cannot express (nested collections, arrays
    /// inside collection elements, non-collection containers)
    #[error("Unsupported layout for column '{column}': {reason}")]
    UnsupportedLayout { column: String, reason: String },

    /// Entry index outside the chain
    #[error("Entry {entry} out of range (entries: {entries})")]
    EntryOutOfRange { entry: u64, entries: u64 },

    /// No source is loaded in the entry cursor
    #[error("No active source while resolving column '{column}'")]
    NoActiveSource { column: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Returns the diagnostic category for this error.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            ReaderError::MissingColumn { .. } | ReaderError::NoActiveSource { .. } => {
                DiagnosticKind::MissingColumn
            }
            ReaderError::MissingMember { .. }
            | ReaderError::UnknownClass { .. }
            | ReaderError::UnsupportedLayout { .. } => DiagnosticKind::MissingMember,
            ReaderError::ReadError { .. } | ReaderError::EntryOutOfRange { .. } => {
                DiagnosticKind::ReadError
            }
            ReaderError::TypeMismatch { .. } => DiagnosticKind::TypeMismatch,
            ReaderError::InvalidOffset { .. } => DiagnosticKind::InvalidOffset,
            ReaderError::Config(_) => DiagnosticKind::Config,
        }
    }

    /// Returns the column path the error refers to, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            ReaderError::MissingColumn { column, .. }
            | ReaderError::MissingMember { column, .. }
            | ReaderError::UnknownClass { column, .. }
            | ReaderError::ReadError { column, .. }
            | ReaderError::TypeMismatch { column, .. }
            | ReaderError::InvalidOffset { column, .. }
            | ReaderError::UnsupportedLayout { column, .. }
            | ReaderError::NoActiveSource { column } => Some(column),
            ReaderError::EntryOutOfRange { .. } | ReaderError::Config(_) => None,
        }
    }

    /// Returns the source name the error refers to, if known.
    pub fn source_name(&self) -> Option<&str> {
        match self {
            ReaderError::MissingColumn { source_name, .. }
            | ReaderError::ReadError { source_name, .. } => Some(source_name),
            _ => None,
        }
    }
}

/// Errors raised while building in-memory sources and chains.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Column defined twice in one source
    #[error("Column '{column}' already exists in source '{source_name}'")]
    DuplicateColumn { column: String, source_name: String },

    /// Column entry count disagrees with the rest of the source
    #[error("Column '{column}' has {got} entries, expected {expected}")]
    EntryCountMismatch {
        column: String,
        expected: u64,
        got: u64,
    },

    /// Counted column refers to a missing count column
    #[error("Count column '{count_column}' for column '{column}' not found")]
    UnknownCountColumn { column: String, count_column: String },

    /// Counted column entry length disagrees with its count column
    #[error("Column '{column}' entry {entry} holds {got} elements, count column says {expected}")]
    CountMismatch {
        column: String,
        entry: u64,
        expected: u64,
        got: u64,
    },

    /// Element type name unknown
    #[error("Unknown element type '{type_name}' for column '{column}'")]
    UnknownType { column: String, type_name: String },

    /// Value does not fit the declared element type
    #[error("Invalid value for column '{column}': {message}")]
    InvalidValue { column: String, message: String },

    /// Description document could not be parsed
    #[error("Invalid source description: {0}")]
    InvalidDescription(String),

    /// I/O error while reading a description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Byte range outside an entry slice.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Range at offset {offset} with length {len} exceeds slice length {available}")]
pub struct BoundsError {
    pub offset: usize,
    pub len: usize,
    pub available: usize,
}
