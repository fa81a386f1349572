//! Resolved column metadata and per-entry location evaluation.

use std::fmt;

use crate::error::{BoundsError, ReaderError};
use crate::source::{EntrySlice, Source, BLOCK_HEADER_SIZE};
use crate::types::Element;

/// How many values a column yields per entry.
///
/// Exactly one shape applies to a resolved column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    Scalar,
    FixedArray { length: usize },
    /// Length read per entry from a sibling count column
    CountedArray { count_column: String },
    /// One value per element of a collection or container
    Collection,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueShape::Scalar => write!(f, "scalar"),
            ValueShape::FixedArray { length } => write!(f, "array[{}]", length),
            ValueShape::CountedArray { count_column } => write!(f, "array[{}]", count_column),
            ValueShape::Collection => write!(f, "collection"),
        }
    }
}

/// One step from an entry's base slice to the column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessStep {
    /// Skip bytes. Inside an element block, applies to every element.
    Offset(usize),
    /// Replace the slice with the object whose handle is stored at its start.
    Deref,
    /// Enter an element block; the values repeat every `stride` bytes.
    Elements { stride: usize },
}

/// Resolved metadata for one column path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Dotted path of the proxy
    pub path: String,
    /// Source column holding the entry base
    pub column: String,
    pub declared_type: String,
    /// Concrete class; for containers the container class
    pub runtime_class: String,
    /// Value class of a collection-valued column
    pub value_class: Option<String>,
    /// Type name of the values readers produce
    pub element_type: String,
    /// Bytes from the most recent base (entry, loaded object or element start)
    pub offset: usize,
    /// Offset of this member within its parent class
    pub member_offset: usize,
    pub element_size: usize,
    pub array_length: usize,
    pub is_pointer: bool,
    pub is_top_level_aggregate: bool,
    pub is_indexed_container: bool,
    pub shape: ValueShape,
    pub steps: Vec<AccessStep>,
}

impl ColumnDescriptor {
    pub fn is_collection_valued(&self) -> bool {
        self.shape == ValueShape::Collection
    }

    pub fn has_dynamic_length(&self) -> bool {
        matches!(self.shape, ValueShape::CountedArray { .. })
    }

    pub fn is_fixed_array(&self) -> bool {
        matches!(self.shape, ValueShape::FixedArray { .. })
    }

    /// Returns `true` if values of this column repeat per container element.
    pub fn in_elements(&self) -> bool {
        self.steps
            .iter()
            .any(|s| matches!(s, AccessStep::Elements { .. }))
    }

    /// Offset of a child member relative to the base it will be read from.
    pub(crate) fn child_base_offset(&self) -> usize {
        match self.steps.last() {
            Some(AccessStep::Deref) | Some(AccessStep::Elements { .. }) => 0,
            _ => self.offset,
        }
    }

    /// Short description used in type mismatch reports.
    pub fn describe(&self) -> String {
        format!("{} of {}", self.shape, self.element_type)
    }

    /// Walks the access steps from `base`.
    ///
    /// `count` is the per-entry length of a counted array.
    pub fn locate_in(
        &self,
        base: EntrySlice,
        source: &dyn Source,
        entry: u64,
        count: Option<usize>,
    ) -> Result<Location, ReaderError> {
        let bounds = |e: BoundsError| ReaderError::InvalidOffset {
            column: self.path.clone(),
            offset: e.offset as i64,
            max: e.available,
        };

        let mut slice = base;
        let mut elements: Option<(usize, usize)> = None;
        let mut within = 0usize;

        for (i, step) in self.steps.iter().enumerate() {
            match *step {
                AccessStep::Offset(n) if elements.is_some() => within += n,
                AccessStep::Offset(n) => slice = slice.offset_by(n).map_err(bounds)?,
                AccessStep::Deref => {
                    let handle = slice.read_handle(0).map_err(bounds)?;
                    if handle.is_null() {
                        if matches!(self.steps.get(i + 1), Some(AccessStep::Elements { .. })) {
                            return Ok(Location::empty(slice, self.element_size));
                        }
                        return Err(self.read_error(source, entry, "null object handle"));
                    }
                    slice = source
                        .load_object(handle)
                        .ok_or_else(|| self.read_error(source, entry, "dangling object handle"))?;
                }
                AccessStep::Elements { stride } => {
                    let header = slice.subslice(0, BLOCK_HEADER_SIZE).map_err(bounds)?;
                    let n = u64::decode(header.as_bytes())
                        .ok_or_else(|| self.read_error(source, entry, "truncated element block"))?;
                    let n = usize::try_from(n)
                        .map_err(|_| self.read_error(source, entry, "element count overflow"))?;
                    slice = slice.offset_by(BLOCK_HEADER_SIZE).map_err(bounds)?;
                    elements = Some((n, stride));
                    within = 0;
                }
            }
        }

        let (first, count, stride) = match (elements, &self.shape) {
            (Some((n, stride)), _) => (within, n, stride),
            (None, ValueShape::FixedArray { length }) => (0, *length, self.element_size),
            (None, ValueShape::CountedArray { .. }) => (0, count.unwrap_or(0), self.element_size),
            (None, _) => (0, 1, self.element_size),
        };

        let location = Location {
            slice,
            first,
            count,
            stride,
            element_size: self.element_size,
        };
        location.check_bounds().map_err(bounds)?;
        Ok(location)
    }

    fn read_error(&self, source: &dyn Source, entry: u64, reason: &str) -> ReaderError {
        ReaderError::ReadError {
            column: self.path.clone(),
            entry,
            source_name: source.name().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Where the values of one column lie for one entry.
#[derive(Debug, Clone)]
pub struct Location {
    slice: EntrySlice,
    first: usize,
    count: usize,
    stride: usize,
    element_size: usize,
}

impl Location {
    /// A location holding no values.
    pub fn empty(slice: EntrySlice, element_size: usize) -> Self {
        Self {
            slice,
            first: 0,
            count: 0,
            stride: element_size,
            element_size,
        }
    }

    /// Number of values.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Returns `true` if the values lie back to back.
    pub fn is_packed(&self) -> bool {
        self.count <= 1 || self.stride == self.element_size
    }

    /// Returns all values as one byte run when they are packed.
    pub fn packed_bytes(&self) -> Option<&[u8]> {
        if !self.is_packed() {
            return None;
        }
        let len = self.count.checked_mul(self.element_size)?;
        self.slice.as_bytes().get(self.first..self.first.checked_add(len)?)
    }

    /// Returns the bytes of value `index`.
    pub fn element_bytes(&self, index: usize) -> Option<&[u8]> {
        if index >= self.count {
            return None;
        }
        let start = self.first.checked_add(index.checked_mul(self.stride)?)?;
        self.slice
            .as_bytes()
            .get(start..start.checked_add(self.element_size)?)
    }

    fn check_bounds(&self) -> Result<(), BoundsError> {
        if self.count == 0 {
            return Ok(());
        }
        let error = BoundsError {
            offset: self.first,
            len: self.element_size,
            available: self.slice.len(),
        };
        let last = (self.count - 1)
            .checked_mul(self.stride)
            .and_then(|n| n.checked_add(self.first))
            .and_then(|n| n.checked_add(self.element_size))
            .ok_or(error)?;
        if last > self.slice.len() {
            return Err(error);
        }
        Ok(())
    }
}
