//! Ordered concatenation of sources presented as one entry range.

use std::sync::Arc;

use crate::error::ReaderError;
use crate::source::Source;
use crate::types::SchemaGeneration;

/// One source of a chain.
#[derive(Debug, Clone)]
pub struct ChainElement {
    pub title: String,
    pub source: Arc<dyn Source>,
    /// Global index of the first entry of this element
    pub first_entry: u64,
}

impl ChainElement {
    pub fn entries(&self) -> u64 {
        self.source.entries()
    }
}

/// Emitted when the chain moves to a different element.
///
/// Carries the new element's entry count and schema generation.
#[derive(Debug, Clone)]
pub struct SourceTransition {
    pub element: usize,
    pub source_name: String,
    pub entries: u64,
    pub generation: SchemaGeneration,
    /// The previous element had a different generation, or there was none
    pub schema_changed: bool,
    pub source: Arc<dyn Source>,
}

/// Result of positioning the chain on a global entry.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub element: usize,
    pub local_entry: u64,
    pub transition: Option<SourceTransition>,
}

/// Sequence of sources read as one.
#[derive(Debug, Default)]
pub struct Chain {
    elements: Vec<ChainElement>,
    current: Option<usize>,
    total_entries: u64,
}

impl Chain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chain of a single source.
    pub fn single(title: impl Into<String>, source: Arc<dyn Source>) -> Self {
        let mut chain = Self::new();
        chain.push(title, source);
        chain
    }

    /// Appends a source. Its entries follow those of the previous sources.
    pub fn push(&mut self, title: impl Into<String>, source: Arc<dyn Source>) {
        let first_entry = self.total_entries;
        self.total_entries += source.entries();
        self.elements.push(ChainElement {
            title: title.into(),
            source,
            first_entry,
        });
    }

    /// Total number of entries across all sources.
    pub fn total_entries(&self) -> u64 {
        self.total_entries
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, index: usize) -> Option<&ChainElement> {
        self.elements.get(index)
    }

    pub fn elements(&self) -> impl Iterator<Item = &ChainElement> {
        self.elements.iter()
    }

    /// Index of the element the chain is positioned on.
    pub fn current_element(&self) -> Option<usize> {
        self.current
    }

    /// Maps a global entry to `(element index, local entry)`.
    ///
    /// Empty elements are never returned.
    pub fn locate(&self, global: u64) -> Option<(usize, u64)> {
        if global >= self.total_entries {
            return None;
        }
        let index = self
            .elements
            .partition_point(|e| e.first_entry <= global)
            .checked_sub(1)?;
        let element = &self.elements[index];
        let local = global - element.first_entry;
        (local < element.entries()).then_some((index, local))
    }

    /// Positions the chain on `global`.
    ///
    /// Returns a transition when the entry lies in a different element than
    /// the previous one.
    pub fn load_entry(&mut self, global: u64) -> Result<LoadOutcome, ReaderError> {
        let (index, local_entry) =
            self.locate(global)
                .ok_or(ReaderError::EntryOutOfRange {
                    entry: global,
                    entries: self.total_entries,
                })?;

        let transition = if self.current == Some(index) {
            None
        } else {
            let previous = self
                .current
                .and_then(|i| self.elements.get(i))
                .map(|e| e.source.generation());
            let element = &self.elements[index];
            let generation = element.source.generation();
            Some(SourceTransition {
                element: index,
                source_name: element.source.name().to_string(),
                entries: element.entries(),
                generation,
                schema_changed: previous != Some(generation),
                source: Arc::clone(&element.source),
            })
        };
        self.current = Some(index);

        Ok(LoadOutcome {
            element: index,
            local_entry,
            transition,
        })
    }

    /// Forgets the current element so the next load reports a transition.
    pub fn rewind(&mut self) {
        self.current = None;
    }
}
