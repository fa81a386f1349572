use crate::director::Director;
use crate::error::ReaderError;
use crate::proxy::{Location, ProxyRef};
use crate::source::ReadStatus;
use crate::types::Element;

use super::base::{ReaderBase, ReaderKind, SetupStatus};

/// Reads a sequence of values per entry: fixed arrays, counted arrays and
/// collection-valued columns.
///
/// Contiguous storage is viewed in place. Anything else is copied into a
/// buffer owned by the reader; the first copy is reported once.
#[derive(Debug)]
pub struct ArrayReader<T: Element> {
    base: ReaderBase,
    view: Option<Location>,
    buffer: Vec<T>,
    copy_reported: bool,
}

impl<T: Element> ArrayReader<T> {
    pub fn new(director: Director, proxy: ProxyRef) -> Self {
        Self {
            base: ReaderBase::new(director, proxy, ReaderKind::Array, T::TYPE_NAME),
            view: None,
            buffer: Vec::new(),
            copy_reported: false,
        }
    }

    /// Returns the values at global entry `entry`.
    ///
    /// The returned slice stays valid and address-stable until a different
    /// entry is requested.
    pub fn get(&mut self, entry: u64) -> Result<Option<&[T]>, ReaderError> {
        if !self.base.is_cached(entry) {
            let Some(fetched) = self.base.fetch(entry)? else {
                return Ok(None);
            };
            let location = fetched.location;

            if location.count() == 0 {
                self.view = None;
                self.buffer.clear();
            } else if fetched.contiguous && location.packed_bytes().and_then(T::view).is_some() {
                self.view = Some(location);
            } else {
                self.view = None;
                if !copy_into(&location, &mut self.buffer) {
                    return Ok(None);
                }
                if !self.copy_reported {
                    self.copy_reported = true;
                    self.base.report_copy();
                }
            }
            self.base.commit(entry);
        }

        Ok(match &self.view {
            Some(location) => location.packed_bytes().and_then(T::view),
            None => Some(self.buffer.as_slice()),
        })
    }

    /// Returns `true` if the last values were viewed in place.
    pub fn is_view(&self) -> bool {
        self.view.is_some()
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

/// Decodes every value of `location` into `buffer`, replacing its contents.
pub(crate) fn copy_into<T: Element>(location: &Location, buffer: &mut Vec<T>) -> bool {
    buffer.clear();
    buffer.reserve(location.count());
    for index in 0..location.count() {
        match location.element_bytes(index).and_then(T::decode) {
            Some(value) => buffer.push(value),
            None => {
                buffer.clear();
                return false;
            }
        }
    }
    true
}
