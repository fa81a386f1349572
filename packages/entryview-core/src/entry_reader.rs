//! Entry-by-entry reading session.

use std::sync::Arc;

use crate::chain::Chain;
use crate::config::ReaderConfig;
use crate::director::Director;
use crate::proxy::ProxyRef;
use crate::reader::{ArrayReader, BoolArrayReader, FixedArrayReader, ValueReader};
use crate::types::{Element, TypeCatalog};

/// Outcome of positioning an [`EntryReader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Positioned on a loaded entry
    Valid,
    /// No entry requested yet
    NotLoaded,
    /// Requested entry is outside the chain
    EntryNotFound,
    /// Iteration ran past the last entry
    Exhausted,
}

/// Iterates the entries of a chain and hands out typed readers bound to
/// the same session.
///
/// ```ignore
/// let mut entries = EntryReader::new(chain, catalog);
/// let mut px = entries.value::<f32>("px");
/// while entries.next() {
///     if let Some(entry) = entries.current_entry() {
///         println!("{:?}", px.get(entry)?);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct EntryReader {
    director: Director,
    next_entry: u64,
    current: Option<u64>,
    status: EntryStatus,
}

impl EntryReader {
    pub fn new(chain: Chain, catalog: Arc<dyn TypeCatalog>) -> Self {
        Self::with_config(chain, catalog, ReaderConfig::default())
    }

    pub fn with_config(chain: Chain, catalog: Arc<dyn TypeCatalog>, config: ReaderConfig) -> Self {
        Self::from_director(Director::with_config(chain, catalog, config))
    }

    /// Wraps an existing session.
    pub fn from_director(director: Director) -> Self {
        Self {
            director,
            next_entry: 0,
            current: None,
            status: EntryStatus::NotLoaded,
        }
    }

    /// Advances to the next entry. Returns `false` once the chain is
    /// exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> bool {
        if self.next_entry >= self.director.total_entries() {
            self.current = None;
            self.status = EntryStatus::Exhausted;
            return false;
        }
        match self.set_entry(self.next_entry) {
            EntryStatus::Valid => true,
            _ => {
                self.status = EntryStatus::Exhausted;
                false
            }
        }
    }

    /// Positions the session on global entry `entry`.
    ///
    /// A following [`next`](Self::next) continues after `entry`.
    pub fn set_entry(&mut self, entry: u64) -> EntryStatus {
        match self.director.load_entry(entry) {
            Ok(_) => {
                self.current = Some(entry);
                self.next_entry = entry + 1;
                self.status = EntryStatus::Valid;
            }
            Err(error) => {
                tracing::debug!(entry, %error, "Entry not found");
                self.current = None;
                self.status = EntryStatus::EntryNotFound;
            }
        }
        self.status
    }

    /// Rewinds to before the first entry.
    pub fn restart(&mut self) {
        self.director.rewind();
        self.next_entry = 0;
        self.current = None;
        self.status = EntryStatus::NotLoaded;
    }

    pub fn current_entry(&self) -> Option<u64> {
        self.current
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    /// Total number of entries in the chain.
    pub fn entries(&self) -> u64 {
        self.director.total_entries()
    }

    pub fn director(&self) -> &Director {
        &self.director
    }

    /// Returns the shared proxy for a column path.
    pub fn proxy(&self, path: &str) -> ProxyRef {
        self.director.proxy(path)
    }

    pub fn value<T: Element>(&self, path: &str) -> ValueReader<T> {
        ValueReader::new(self.director.clone(), self.director.proxy(path))
    }

    pub fn array<T: Element>(&self, path: &str) -> ArrayReader<T> {
        ArrayReader::new(self.director.clone(), self.director.proxy(path))
    }

    pub fn bool_array(&self, path: &str) -> BoolArrayReader {
        BoolArrayReader::new(self.director.clone(), self.director.proxy(path))
    }

    pub fn fixed_array<T: Element, const N: usize>(&self, path: &str) -> FixedArrayReader<T, N> {
        FixedArrayReader::new(self.director.clone(), self.director.proxy(path))
    }

    /// Reads `member` of the object `parent` yields.
    pub fn member_value<T: Element>(&self, parent: &ProxyRef, member: &str) -> ValueReader<T> {
        ValueReader::new(
            self.director.clone(),
            self.director.member_proxy(parent, member),
        )
    }

    /// Reads `member` of every element `parent` yields.
    pub fn member_array<T: Element>(&self, parent: &ProxyRef, member: &str) -> ArrayReader<T> {
        ArrayReader::new(
            self.director.clone(),
            self.director.member_proxy(parent, member),
        )
    }
}
