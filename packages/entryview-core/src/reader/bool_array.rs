use crate::director::Director;
use crate::error::ReaderError;
use crate::proxy::ProxyRef;
use crate::source::ReadStatus;

use super::array::copy_into;
use super::base::{ReaderBase, ReaderKind, SetupStatus};

/// Reads a sequence of bools per entry.
///
/// Stored bools are bytes that need not be 0 or 1, so values are always
/// decoded into an owned buffer.
#[derive(Debug)]
pub struct BoolArrayReader {
    base: ReaderBase,
    buffer: Vec<bool>,
}

impl BoolArrayReader {
    pub fn new(director: Director, proxy: ProxyRef) -> Self {
        Self {
            base: ReaderBase::new(director, proxy, ReaderKind::BoolArray, "bool"),
            buffer: Vec::new(),
        }
    }

    pub fn get(&mut self, entry: u64) -> Result<Option<&[bool]>, ReaderError> {
        if !self.base.is_cached(entry) {
            let Some(fetched) = self.base.fetch(entry)? else {
                return Ok(None);
            };
            if !copy_into(&fetched.location, &mut self.buffer) {
                return Ok(None);
            }
            self.base.commit(entry);
        }
        Ok(Some(self.buffer.as_slice()))
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
