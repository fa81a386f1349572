//! Per-session diagnostic log.
//!
//! Every recoverable condition reported by proxies and readers is emitted
//! through `tracing` and recorded here, so callers and tests can inspect
//! what happened without a subscriber installed.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use crate::error::ReaderError;

/// Diagnostic categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    MissingColumn,
    MissingMember,
    ReadError,
    TypeMismatch,
    InvalidOffset,
    /// A reader fell back to element-wise copying
    NonContiguousCopy,
    Config,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::MissingColumn => "missing-column",
            DiagnosticKind::MissingMember => "missing-member",
            DiagnosticKind::ReadError => "read-error",
            DiagnosticKind::TypeMismatch => "type-mismatch",
            DiagnosticKind::InvalidOffset => "invalid-offset",
            DiagnosticKind::NonContiguousCopy => "non-contiguous-copy",
            DiagnosticKind::Config => "config",
        };
        f.write_str(name)
    }
}

/// One reported condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub column: String,
    pub source_name: Option<String>,
    pub message: String,
}

/// Bounded log of diagnostics with per-kind counters.
#[derive(Debug)]
pub struct Diagnostics {
    records: RefCell<VecDeque<Diagnostic>>,
    counts: RefCell<BTreeMap<DiagnosticKind, usize>>,
    capacity: usize,
}

impl Diagnostics {
    /// Creates a log keeping at most `capacity` recent records.
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RefCell::new(VecDeque::new()),
            counts: RefCell::new(BTreeMap::new()),
            capacity,
        }
    }

    /// Records a diagnostic and emits it through `tracing`.
    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.kind {
            DiagnosticKind::TypeMismatch | DiagnosticKind::MissingColumn => {
                tracing::error!(
                    kind = %diagnostic.kind,
                    column = %diagnostic.column,
                    source = diagnostic.source_name.as_deref().unwrap_or("-"),
                    "{}",
                    diagnostic.message
                );
            }
            _ => {
                tracing::warn!(
                    kind = %diagnostic.kind,
                    column = %diagnostic.column,
                    source = diagnostic.source_name.as_deref().unwrap_or("-"),
                    "{}",
                    diagnostic.message
                );
            }
        }

        *self.counts.borrow_mut().entry(diagnostic.kind).or_insert(0) += 1;

        if self.capacity == 0 {
            return;
        }
        let mut records = self.records.borrow_mut();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(diagnostic);
    }

    /// Records a reader error.
    pub fn report_error(&self, error: &ReaderError) {
        self.report(Diagnostic {
            kind: error.kind(),
            column: error.column().unwrap_or_default().to_string(),
            source_name: error.source_name().map(str::to_string),
            message: error.to_string(),
        });
    }

    /// Number of diagnostics of `kind` reported so far.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.counts.borrow().get(&kind).copied().unwrap_or(0)
    }

    /// Total number of diagnostics reported so far.
    pub fn total(&self) -> usize {
        self.counts.borrow().values().sum()
    }

    /// Returns the retained records, oldest first.
    pub fn recent(&self) -> Vec<Diagnostic> {
        self.records.borrow().iter().cloned().collect()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(256)
    }
}
