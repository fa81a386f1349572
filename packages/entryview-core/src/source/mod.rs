//! Entry sources: the storage a reading session pulls column bytes from.
//!
//! A [`Source`] exposes per-entry byte slices for its columns plus the
//! read status and contiguity of each column. Slices are explicit
//! `(storage, range)` pairs, never raw addresses.

pub mod buffer;
pub mod description;
pub mod memory;
pub mod object_writer;
pub mod schema;

use std::fmt::Debug;

use crate::types::SchemaGeneration;

pub use buffer::{
    encode_block, BufferStorage, ColumnBuffer, EntrySlice, ObjectHandle, BLOCK_HEADER_SIZE,
};
pub use description::{ChainDescription, ColumnDescription, SourceDescription};
pub use memory::{MemorySource, MemorySourceBuilder};
pub use object_writer::ObjectWriter;
pub use schema::{ColumnKind, ColumnSchema, SourceSchema};

/// Outcome of reading one column at one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Ok,
    Error,
}

/// Per-entry column storage.
///
/// Implementations must be safe for concurrent read-only access; sessions
/// on separate threads may share one source.
pub trait Source: Send + Sync + Debug {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Schema generation the source was written with.
    fn generation(&self) -> SchemaGeneration;

    /// Number of entries.
    fn entries(&self) -> u64;

    /// Column layout of the source.
    fn schema(&self) -> &SourceSchema;

    /// Returns the bytes stored for `column` at `entry`.
    fn column_base(&self, column: &str, entry: u64) -> Option<EntrySlice>;

    /// Returns the number of bytes stored for `column` at `entry`.
    fn column_raw_size(&self, column: &str, entry: u64) -> usize {
        self.column_base(column, entry).map_or(0, |slice| slice.len())
    }

    /// Returns whether `column` can be read at `entry`.
    fn read_status(&self, column: &str, entry: u64) -> ReadStatus;

    /// Returns `true` if elements of `column` lie back to back in storage
    /// that may be viewed in place.
    fn is_contiguous(&self, column: &str) -> bool;

    /// Returns the object a pointer or collection handle refers to.
    fn load_object(&self, handle: ObjectHandle) -> Option<EntrySlice>;
}
