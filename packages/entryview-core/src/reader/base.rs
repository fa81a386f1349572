use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::director::Director;
use crate::error::ReaderError;
use crate::proxy::{ColumnDescriptor, Location, ProxyRef, ValueShape};
use crate::source::ReadStatus;

/// Access pattern a reader front-end expects from its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderKind {
    /// One value per entry
    Scalar,
    /// Fixed, counted or collection-valued sequence
    Array,
    /// Sequence of bools, always copied
    BoolArray,
    /// Fixed array of exactly `length` values
    FixedSizeBuffer { length: usize },
}

/// Outcome of the last resolution attempt of a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    /// No entry requested yet
    NotSetUp,
    /// Column resolved and matches the reader
    Match,
    /// Column could not be resolved in the current source
    Unresolved,
    /// Column resolved to a different type or shape
    TypeMismatch,
    /// Requested entry is outside the chain
    EntryNotFound,
}

pub(crate) struct Fetched {
    pub location: Location,
    /// Source storage may be viewed in place
    pub contiguous: bool,
}

/// State shared by all reader front-ends: the proxy, the cached entry and
/// the statuses of the last access.
#[derive(Debug)]
pub(crate) struct ReaderBase {
    director: Director,
    proxy: ProxyRef,
    kind: ReaderKind,
    element_type: &'static str,
    last_entry: Option<u64>,
    epoch: u64,
    setup_status: SetupStatus,
    read_status: ReadStatus,
}

impl ReaderBase {
    pub fn new(
        director: Director,
        proxy: ProxyRef,
        kind: ReaderKind,
        element_type: &'static str,
    ) -> Self {
        Self {
            director,
            proxy,
            kind,
            element_type,
            last_entry: None,
            epoch: 0,
            setup_status: SetupStatus::NotSetUp,
            read_status: ReadStatus::Ok,
        }
    }

    /// Returns `true` if the value cached for `entry` is still valid.
    #[inline]
    pub fn is_cached(&self, entry: u64) -> bool {
        if self.last_entry != Some(entry) {
            return false;
        }
        let proxy = self.proxy.borrow();
        proxy.is_resolved() && proxy.epoch() == self.epoch
    }

    /// Positions the session on `entry` and locates the column's values.
    ///
    /// `Ok(None)` means no value for this entry; the condition has been
    /// reported. Only a type or shape mismatch is an error.
    pub fn fetch(&mut self, entry: u64) -> Result<Option<Fetched>, ReaderError> {
        let local = match self.director.load_entry(entry) {
            Ok(local) => local,
            Err(error) => {
                tracing::debug!(entry, %error, "Entry not loaded");
                self.setup_status = SetupStatus::EntryNotFound;
                return Ok(None);
            }
        };

        let mut proxy = self.proxy.borrow_mut();
        if !proxy.setup(&self.director) {
            self.setup_status = SetupStatus::Unresolved;
            return Ok(None);
        }
        let Some(descriptor) = proxy.descriptor() else {
            self.setup_status = SetupStatus::Unresolved;
            return Ok(None);
        };
        if let Err(error) = self.check_shape(descriptor) {
            self.setup_status = SetupStatus::TypeMismatch;
            self.director.diagnostics().report_error(&error);
            return Err(error);
        }
        let column = descriptor.column.clone();

        let Some(source) = self.director.current_source() else {
            self.setup_status = SetupStatus::Unresolved;
            return Ok(None);
        };
        self.setup_status = SetupStatus::Match;

        self.read_status = source.read_status(&column, local);
        if self.read_status == ReadStatus::Error {
            self.director
                .diagnostics()
                .report_error(&ReaderError::ReadError {
                    column: proxy.path().to_string(),
                    entry: local,
                    source_name: source.name().to_string(),
                    reason: "source reported a read failure".to_string(),
                });
            return Ok(None);
        }

        let location = match proxy.locate(&self.director, local) {
            Ok(location) => location,
            Err(error) => {
                self.read_status = ReadStatus::Error;
                self.director.diagnostics().report_error(&error);
                return Ok(None);
            }
        };

        self.epoch = proxy.epoch();
        Ok(Some(Fetched {
            contiguous: source.is_contiguous(&column) && location.is_packed(),
            location,
        }))
    }

    /// Records `entry` as cached. Call only after the value was stored.
    pub fn commit(&mut self, entry: u64) {
        self.last_entry = Some(entry);
    }

    fn check_shape(&self, descriptor: &ColumnDescriptor) -> Result<(), ReaderError> {
        let shape_ok = match self.kind {
            ReaderKind::Scalar => descriptor.shape == ValueShape::Scalar,
            ReaderKind::Array | ReaderKind::BoolArray => descriptor.shape != ValueShape::Scalar,
            ReaderKind::FixedSizeBuffer { length } => {
                descriptor.shape == ValueShape::FixedArray { length }
            }
        };
        if shape_ok && descriptor.element_type == self.element_type {
            return Ok(());
        }

        let expected = match self.kind {
            ReaderKind::Scalar => format!("scalar of {}", self.element_type),
            ReaderKind::Array | ReaderKind::BoolArray => format!("array of {}", self.element_type),
            ReaderKind::FixedSizeBuffer { length } => {
                format!("array[{}] of {}", length, self.element_type)
            }
        };
        Err(ReaderError::TypeMismatch {
            column: descriptor.path.clone(),
            expected,
            got: descriptor.describe(),
        })
    }

    /// Reports the first copy fallback of a reader.
    pub fn report_copy(&self) {
        if !self.director.config().warn_on_copy {
            return;
        }
        let path = self.proxy.borrow().path().to_string();
        let source_name = self.director.current_source().map(|s| s.name().to_string());
        self.director.diagnostics().report(Diagnostic {
            kind: DiagnosticKind::NonContiguousCopy,
            message: format!(
                "Column '{}' is not contiguous in source '{}'; values are copied element by element",
                path,
                source_name.as_deref().unwrap_or("-")
            ),
            column: path,
            source_name,
        });
    }

    pub fn kind(&self) -> ReaderKind {
        self.kind
    }

    pub fn setup_status(&self) -> SetupStatus {
        self.setup_status
    }

    pub fn read_status(&self) -> ReadStatus {
        self.read_status
    }

    pub fn proxy(&self) -> &ProxyRef {
        &self.proxy
    }

    pub fn last_entry(&self) -> Option<u64> {
        self.last_entry
    }
}
