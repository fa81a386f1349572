//! In-memory source.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::SourceError;
use crate::types::element::{basic_type_size, decode_count};
use crate::types::{Element, SchemaGeneration};

use super::buffer::{encode_block, BufferStorage, ColumnBuffer, EntrySlice, ObjectHandle};
use super::schema::{ColumnKind, ColumnSchema, SourceSchema};
use super::{ReadStatus, Source};

/// A source holding all entries in memory.
#[derive(Debug)]
pub struct MemorySource {
    name: String,
    generation: SchemaGeneration,
    schema: SourceSchema,
    entries: u64,
    columns: HashMap<String, ColumnBuffer>,
    heap: Vec<Arc<BufferStorage>>,
    read_errors: HashSet<(String, u64)>,
    non_contiguous: HashSet<String>,
}

impl MemorySource {
    /// Starts building a source named `name`.
    pub fn builder(name: impl Into<String>) -> MemorySourceBuilder {
        MemorySourceBuilder::new(name)
    }

    /// Number of objects on the heap.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generation(&self) -> SchemaGeneration {
        self.generation
    }

    fn entries(&self) -> u64 {
        self.entries
    }

    fn schema(&self) -> &SourceSchema {
        &self.schema
    }

    fn column_base(&self, column: &str, entry: u64) -> Option<EntrySlice> {
        self.columns.get(column)?.entry(entry)
    }

    fn column_raw_size(&self, column: &str, entry: u64) -> usize {
        self.columns
            .get(column)
            .and_then(|c| c.entry_len(entry))
            .unwrap_or(0)
    }

    fn read_status(&self, column: &str, entry: u64) -> ReadStatus {
        if self.read_errors.contains(&(column.to_string(), entry)) {
            ReadStatus::Error
        } else {
            ReadStatus::Ok
        }
    }

    fn is_contiguous(&self, column: &str) -> bool {
        self.columns.contains_key(column) && !self.non_contiguous.contains(column)
    }

    fn load_object(&self, handle: ObjectHandle) -> Option<EntrySlice> {
        let index = usize::try_from(handle.0.checked_sub(1)?).ok()?;
        self.heap
            .get(index)
            .map(|storage| EntrySlice::whole(Arc::clone(storage)))
    }
}

struct PendingColumn {
    schema: ColumnSchema,
    entries: Vec<Vec<u8>>,
}

/// Builder for [`MemorySource`].
///
/// Column methods consume and return the builder; heap allocation borrows
/// it so handles can be embedded in later columns.
pub struct MemorySourceBuilder {
    name: String,
    generation: Option<SchemaGeneration>,
    columns: Vec<PendingColumn>,
    heap: Vec<Vec<u8>>,
    read_errors: HashSet<(String, u64)>,
    non_contiguous: HashSet<String>,
}

impl MemorySourceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generation: None,
            columns: Vec::new(),
            heap: Vec::new(),
            read_errors: HashSet::new(),
            non_contiguous: HashSet::new(),
        }
    }

    /// Sets the schema generation. Defaults to the schema fingerprint.
    pub fn generation(mut self, generation: SchemaGeneration) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Adds a scalar column, one value per entry.
    pub fn scalar<T: Element>(self, name: impl Into<String>, values: &[T]) -> Self {
        let entries = values
            .iter()
            .map(|v| {
                let mut bytes = Vec::with_capacity(T::SIZE);
                v.encode(&mut bytes);
                bytes
            })
            .collect();
        self.leaf(name, T::TYPE_NAME, 1, None, entries)
    }

    /// Adds a fixed-length array column.
    pub fn fixed_array<T: Element, const N: usize>(
        self,
        name: impl Into<String>,
        values: &[[T; N]],
    ) -> Self {
        let entries = values.iter().map(|v| encode_all(v)).collect();
        self.leaf(name, T::TYPE_NAME, N, None, entries)
    }

    /// Adds a variable-length array column whose per-entry length is held
    /// by the integer column `count_column`.
    pub fn counted_array<T: Element>(
        self,
        name: impl Into<String>,
        count_column: impl Into<String>,
        values: &[Vec<T>],
    ) -> Self {
        let entries = values.iter().map(|v| encode_all(v)).collect();
        self.leaf(name, T::TYPE_NAME, 1, Some(count_column.into()), entries)
    }

    /// Adds a leaf column from already encoded entries.
    pub fn leaf(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        array_length: usize,
        count_column: Option<String>,
        entries: Vec<Vec<u8>>,
    ) -> Self {
        self.columns.push(PendingColumn {
            schema: ColumnSchema {
                name: name.into(),
                kind: ColumnKind::Leaf {
                    type_name: type_name.into(),
                    array_length,
                    count_column,
                },
            },
            entries,
        });
        self
    }

    /// Adds a column storing one whole object of `class_name` per entry.
    pub fn object(
        mut self,
        name: impl Into<String>,
        class_name: impl Into<String>,
        entries: Vec<Vec<u8>>,
    ) -> Self {
        self.columns.push(PendingColumn {
            schema: ColumnSchema {
                name: name.into(),
                kind: ColumnKind::Object {
                    class_name: class_name.into(),
                },
            },
            entries,
        });
        self
    }

    /// Adds a fixed-class container column. Each entry lists the encoded
    /// elements of that entry.
    pub fn indexed_container(
        mut self,
        name: impl Into<String>,
        element_class: impl Into<String>,
        entries: &[Vec<Vec<u8>>],
    ) -> Self {
        self.columns.push(PendingColumn {
            schema: ColumnSchema {
                name: name.into(),
                kind: ColumnKind::IndexedContainer {
                    element_class: element_class.into(),
                },
            },
            entries: entries.iter().map(|e| encode_block(e)).collect(),
        });
        self
    }

    /// Adds a collection column of collection class `class_name`.
    pub fn collection(
        mut self,
        name: impl Into<String>,
        class_name: impl Into<String>,
        entries: &[Vec<Vec<u8>>],
    ) -> Self {
        self.columns.push(PendingColumn {
            schema: ColumnSchema {
                name: name.into(),
                kind: ColumnKind::Collection {
                    class_name: class_name.into(),
                },
            },
            entries: entries.iter().map(|e| encode_block(e)).collect(),
        });
        self
    }

    /// Stores an object on the heap and returns its handle.
    pub fn alloc(&mut self, bytes: Vec<u8>) -> ObjectHandle {
        self.heap.push(bytes);
        ObjectHandle(self.heap.len() as u64)
    }

    /// Stores an element block on the heap and returns its handle.
    pub fn alloc_block(&mut self, elements: &[Vec<u8>]) -> ObjectHandle {
        self.alloc(encode_block(elements))
    }

    /// Makes reads of `column` at `entry` report an error.
    pub fn read_error(mut self, column: impl Into<String>, entry: u64) -> Self {
        self.read_errors.insert((column.into(), entry));
        self
    }

    /// Reports `column` as not contiguous.
    pub fn non_contiguous(mut self, column: impl Into<String>) -> Self {
        self.non_contiguous.insert(column.into());
        self
    }

    /// Validates the columns and builds the source.
    pub fn build(self) -> Result<MemorySource, SourceError> {
        let entries = self.columns.first().map_or(0, |c| c.entries.len() as u64);
        let mut seen = HashSet::new();

        for column in &self.columns {
            if !seen.insert(column.schema.name.as_str()) {
                return Err(SourceError::DuplicateColumn {
                    column: column.schema.name.clone(),
                    source_name: self.name.clone(),
                });
            }
            if column.entries.len() as u64 != entries {
                return Err(SourceError::EntryCountMismatch {
                    column: column.schema.name.clone(),
                    expected: entries,
                    got: column.entries.len() as u64,
                });
            }
            if let ColumnKind::Leaf { type_name, .. } = &column.schema.kind {
                if basic_type_size(type_name).is_none() {
                    return Err(SourceError::UnknownType {
                        column: column.schema.name.clone(),
                        type_name: type_name.clone(),
                    });
                }
            }
        }

        for column in &self.columns {
            if let ColumnKind::Leaf {
                type_name,
                count_column: Some(count_column),
                ..
            } = &column.schema.kind
            {
                self.validate_counts(column, type_name, count_column)?;
            }
        }

        let schema = SourceSchema {
            columns: self.columns.iter().map(|c| c.schema.clone()).collect(),
        };
        let generation = self
            .generation
            .unwrap_or_else(|| SchemaGeneration(u64::from(schema.fingerprint())));

        let mut columns = HashMap::with_capacity(self.columns.len());
        for column in self.columns {
            let buffer = ColumnBuffer::new();
            buffer.extend(column.entries.iter().map(Vec::as_slice));
            columns.insert(column.schema.name, buffer);
        }

        tracing::debug!(
            source = %self.name,
            entries,
            columns = columns.len(),
            %generation,
            "Built memory source"
        );

        Ok(MemorySource {
            name: self.name,
            generation,
            schema,
            entries,
            columns,
            heap: self
                .heap
                .iter()
                .map(|bytes| Arc::new(BufferStorage::from_bytes(bytes)))
                .collect(),
            read_errors: self.read_errors,
            non_contiguous: self.non_contiguous,
        })
    }

    fn validate_counts(
        &self,
        column: &PendingColumn,
        type_name: &str,
        count_column: &str,
    ) -> Result<(), SourceError> {
        let unknown = || SourceError::UnknownCountColumn {
            column: column.schema.name.clone(),
            count_column: count_column.to_string(),
        };
        let counts = self
            .columns
            .iter()
            .find(|c| c.schema.name == count_column)
            .ok_or_else(unknown)?;
        let count_type = match &counts.schema.kind {
            ColumnKind::Leaf {
                type_name,
                array_length: 1,
                count_column: None,
            } => type_name.as_str(),
            _ => return Err(unknown()),
        };
        let element_size = basic_type_size(type_name).unwrap_or(1);

        for (entry, (bytes, count_bytes)) in column.entries.iter().zip(&counts.entries).enumerate()
        {
            let expected = decode_count(count_type, count_bytes).ok_or_else(unknown)?;
            let got = (bytes.len() / element_size) as u64;
            if expected < 0 || expected as u64 != got || bytes.len() % element_size != 0 {
                return Err(SourceError::CountMismatch {
                    column: column.schema.name.clone(),
                    entry: entry as u64,
                    expected: expected.max(0) as u64,
                    got,
                });
            }
        }
        Ok(())
    }
}

fn encode_all<T: Element>(values: &[T]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(T::SIZE * values.len());
    for value in values {
        value.encode(&mut bytes);
    }
    bytes
}
