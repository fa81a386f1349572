//! Column storage with copy-on-write publication.
//!
//! Entries are appended by building a new storage block and swapping it in
//! through `ArcSwap`. Slices handed out earlier keep their `Arc` to the old
//! block, so views held by readers stay valid across appends.

use std::ops::Range;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::error::BoundsError;
use crate::types::{Element, HANDLE_SIZE};

/// Immutable byte storage aligned to 8 bytes.
///
/// Backed by `u64` words so every element type up to 8 bytes can be viewed
/// in place when its offset is naturally aligned.
#[derive(Debug, Default)]
pub struct BufferStorage {
    words: Vec<u64>,
    len: usize,
}

impl BufferStorage {
    /// Copies `bytes` into freshly aligned storage.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = vec![0u64; bytes.len().div_ceil(8)];
        let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        dst[..bytes.len()].copy_from_slice(bytes);
        Self {
            words,
            len: bytes.len(),
        }
    }

    /// Returns the stored bytes.
    pub fn as_slice(&self) -> &[u8] {
        let bytes: &[u8] = bytemuck::cast_slice(&self.words);
        &bytes[..self.len]
    }

    /// Returns the length of the storage in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a raw pointer to the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.as_slice().as_ptr()
    }
}

/// Handle to an object stored out of line. Zero is the null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectHandle(pub u64);

impl ObjectHandle {
    pub const NULL: ObjectHandle = ObjectHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A bounds-checked byte range within shared storage.
///
/// This is the `(base, offset)` pair every address computation goes
/// through; the range always lies within the storage.
#[derive(Debug, Clone)]
pub struct EntrySlice {
    storage: Arc<BufferStorage>,
    range: Range<usize>,
}

impl EntrySlice {
    /// Creates a slice over `range` of `storage`.
    pub fn new(storage: Arc<BufferStorage>, range: Range<usize>) -> Result<Self, BoundsError> {
        if range.start > range.end || range.end > storage.len() {
            return Err(BoundsError {
                offset: range.start,
                len: range.end.saturating_sub(range.start),
                available: storage.len(),
            });
        }
        Ok(Self { storage, range })
    }

    /// Creates a slice covering all of `storage`.
    pub fn whole(storage: Arc<BufferStorage>) -> Self {
        let range = 0..storage.len();
        Self { storage, range }
    }

    /// Returns the bytes of this slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.storage
            .as_slice()
            .get(self.range.clone())
            .unwrap_or_default()
    }

    /// Returns the length of the slice in bytes.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Returns `true` if the slice is empty.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Returns the storage this slice points into.
    pub fn storage(&self) -> &Arc<BufferStorage> {
        &self.storage
    }

    /// Returns the byte range of this slice within its storage.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Returns `len` bytes starting `offset` bytes into this slice.
    pub fn subslice(&self, offset: usize, len: usize) -> Result<EntrySlice, BoundsError> {
        let error = BoundsError {
            offset,
            len,
            available: self.len(),
        };
        let end = offset.checked_add(len).ok_or(error)?;
        if end > self.len() {
            return Err(error);
        }
        Ok(EntrySlice {
            storage: Arc::clone(&self.storage),
            range: self.range.start + offset..self.range.start + end,
        })
    }

    /// Returns the rest of this slice after skipping `offset` bytes.
    pub fn offset_by(&self, offset: usize) -> Result<EntrySlice, BoundsError> {
        let len = self.len().checked_sub(offset).ok_or(BoundsError {
            offset,
            len: 0,
            available: self.len(),
        })?;
        self.subslice(offset, len)
    }

    /// Reads an object handle stored at `offset`.
    pub fn read_handle(&self, offset: usize) -> Result<ObjectHandle, BoundsError> {
        let bytes = self.subslice(offset, HANDLE_SIZE)?;
        u64::decode(bytes.as_bytes())
            .map(ObjectHandle)
            .ok_or(BoundsError {
                offset,
                len: HANDLE_SIZE,
                available: self.len(),
            })
    }
}

/// Size of the element-count header that starts every element block.
pub const BLOCK_HEADER_SIZE: usize = 8;

/// Encodes an element block: a `u64` element count followed by the
/// elements back to back.
pub fn encode_block(elements: &[Vec<u8>]) -> Vec<u8> {
    let mut block = Vec::with_capacity(
        BLOCK_HEADER_SIZE + elements.iter().map(Vec::len).sum::<usize>(),
    );
    (elements.len() as u64).encode(&mut block);
    for element in elements {
        block.extend_from_slice(element);
    }
    block
}

#[derive(Debug, Default)]
struct ColumnChunk {
    storage: Arc<BufferStorage>,
    bounds: Vec<Range<usize>>,
}

/// Per-entry column data published through `ArcSwap`.
#[derive(Debug)]
pub struct ColumnBuffer {
    inner: ArcSwap<ColumnChunk>,
}

impl Default for ColumnBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ColumnBuffer {
    /// Creates an empty column buffer.
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(ColumnChunk::default()),
        }
    }

    /// Appends one entry.
    pub fn push_entry(&self, bytes: &[u8]) {
        self.extend(std::iter::once(bytes));
    }

    /// Appends several entries with a single swap.
    ///
    /// Every entry starts on an 8-byte boundary.
    pub fn extend<'a>(&self, entries: impl IntoIterator<Item = &'a [u8]>) {
        let current = self.inner.load_full();
        let mut data = current.storage.as_slice().to_vec();
        let mut bounds = current.bounds.clone();

        for bytes in entries {
            data.resize(data.len().next_multiple_of(8), 0);
            let start = data.len();
            data.extend_from_slice(bytes);
            bounds.push(start..data.len());
        }

        self.inner.store(Arc::new(ColumnChunk {
            storage: Arc::new(BufferStorage::from_bytes(&data)),
            bounds,
        }));
    }

    /// Returns the slice holding `entry`.
    pub fn entry(&self, entry: u64) -> Option<EntrySlice> {
        let chunk = self.inner.load();
        let range = chunk.bounds.get(usize::try_from(entry).ok()?)?.clone();
        Some(EntrySlice {
            storage: Arc::clone(&chunk.storage),
            range,
        })
    }

    /// Returns the size in bytes of `entry`.
    pub fn entry_len(&self, entry: u64) -> Option<usize> {
        let chunk = self.inner.load();
        chunk
            .bounds
            .get(usize::try_from(entry).ok()?)
            .map(|range| range.len())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> u64 {
        self.inner.load().bounds.len() as u64
    }

    /// Returns `true` if no entries were appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
