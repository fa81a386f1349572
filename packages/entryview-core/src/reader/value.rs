use crate::director::Director;
use crate::error::ReaderError;
use crate::proxy::{Location, ProxyRef};
use crate::source::ReadStatus;
use crate::types::Element;

use super::base::{ReaderBase, ReaderKind, SetupStatus};

#[derive(Debug)]
enum ScalarSlot<T> {
    Empty,
    /// Value viewed in place in source storage
    View(Location),
    /// Decoded copy
    Owned(T),
}

/// Reads one value per entry.
#[derive(Debug)]
pub struct ValueReader<T: Element> {
    base: ReaderBase,
    slot: ScalarSlot<T>,
}

impl<T: Element> ValueReader<T> {
    pub fn new(director: Director, proxy: ProxyRef) -> Self {
        Self {
            base: ReaderBase::new(director, proxy, ReaderKind::Scalar, T::TYPE_NAME),
            slot: ScalarSlot::Empty,
        }
    }

    /// Returns the value at global entry `entry`.
    ///
    /// Repeated calls for the same entry return the same reference without
    /// touching the source. `Ok(None)` means the column has no value for
    /// this entry.
    pub fn get(&mut self, entry: u64) -> Result<Option<&T>, ReaderError> {
        if !self.base.is_cached(entry) {
            let Some(fetched) = self.base.fetch(entry)? else {
                return Ok(None);
            };
            let location = fetched.location;
            let Some(bytes) = location.element_bytes(0) else {
                return Ok(None);
            };
            self.slot = if fetched.contiguous && T::view(bytes).is_some() {
                ScalarSlot::View(location)
            } else {
                match T::decode(bytes) {
                    Some(value) => ScalarSlot::Owned(value),
                    None => return Ok(None),
                }
            };
            self.base.commit(entry);
        }

        Ok(match &self.slot {
            ScalarSlot::View(location) => location
                .element_bytes(0)
                .and_then(T::view)
                .and_then(|values| values.first()),
            ScalarSlot::Owned(value) => Some(value),
            ScalarSlot::Empty => None,
        })
    }

    /// Returns `true` if the last value was viewed in place.
    pub fn is_view(&self) -> bool {
        matches!(self.slot, ScalarSlot::View(_))
    }

    pub fn setup_status(&self) -> SetupStatus {
        self.base.setup_status()
    }

    pub fn read_status(&self) -> ReadStatus {
        self.base.read_status()
    }

    pub fn kind(&self) -> ReaderKind {
        self.base.kind()
    }

    pub fn proxy(&self) -> &ProxyRef {
        self.base.proxy()
    }
}
