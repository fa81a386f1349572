use crate::director::Director;
use crate::error::ReaderError;
use crate::proxy::{Location, ProxyRef};
use crate::source::ReadStatus;
use crate::types::Element;

use super::base::{ReaderBase, ReaderKind, SetupStatus};

/// Reads a fixed array of exactly `N` values per entry as `&[T; N]`.
#[derive(Debug)]
pub struct FixedArrayReader<T: Element, const N: usize> {
    base: ReaderBase,
    view: Option<Location>,
    buffer: [T; N],
    copy_reported: bool,
}

impl<T: Element, const N: usize> FixedArrayReader<T, N> {
    pub fn new(director: Director, proxy: ProxyRef) -> Self {
        Self {
            base: ReaderBase::new(
                director,
                proxy,
                ReaderKind::FixedSizeBuffer { length: N },
                T::TYPE_NAME,
            ),
            view: None,
            buffer: [T::default(); N],
            copy_reported: false,
        }
    }

    pub fn get(&mut self, entry: u64) -> Result<Option<&[T; N]>, ReaderError> {
        if !self.base.is_cached(entry) {
            let Some(fetched) = self.base.fetch(entry)? else {
                return Ok(None);
            };
            let location = fetched.location;
            if location.count() != N {
                return Ok(None);
            }

            if fetched.contiguous && location.packed_bytes().and_then(T::view).is_some() {
                self.view = Some(location);
            } else {
                self.view = None;
                for (index, slot) in self.buffer.iter_mut().enumerate() {
                    match location.element_bytes(index).and_then(T::decode) {
                        Some(value) => *slot = value,
                        None => return Ok(None),
                    }
                }
                if !self.copy_reported {
                    self.copy_reported = true;
                    self.base.report_copy();
                }
            }
            self.base.commit(entry);
        }

        Ok(match &self.view {
            Some(location) => location
                .packed_bytes()
                .and_then(T::view)
                .and_then(|values| values.try_into().ok()),
            None => Some(&self.buffer),
        })
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
}
