use crate::error::SourceError;
use crate::types::{ClassLayout, Element};

use super::buffer::ObjectHandle;

/// Encodes one object according to a class layout.
///
/// Members not set stay zeroed.
#[derive(Debug, Clone)]
pub struct ObjectWriter<'a> {
    layout: &'a ClassLayout,
    bytes: Vec<u8>,
}

impl<'a> ObjectWriter<'a> {
    /// Starts a zeroed object of `layout.size` bytes.
    pub fn new(layout: &'a ClassLayout) -> Self {
        Self {
            layout,
            bytes: vec![0; layout.size],
        }
    }

    /// Stores `value` in a basic member. Dotted names are not supported;
    /// write embedded objects with `set_bytes`.
    pub fn set<T: Element>(self, member: &str, value: T) -> Result<Self, SourceError> {
        let mut encoded = Vec::with_capacity(T::SIZE);
        value.encode(&mut encoded);
        self.set_bytes(member, &encoded)
    }

    /// Stores `values` in a fixed-array member.
    pub fn set_array<T: Element>(self, member: &str, values: &[T]) -> Result<Self, SourceError> {
        let mut encoded = Vec::with_capacity(T::SIZE * values.len());
        for value in values {
            value.encode(&mut encoded);
        }
        self.set_bytes(member, &encoded)
    }

    /// Stores an object handle in a pointer or collection member.
    pub fn set_handle(self, member: &str, handle: ObjectHandle) -> Result<Self, SourceError> {
        self.set_bytes(member, &handle.0.to_ne_bytes())
    }

    /// Copies raw bytes into a member.
    pub fn set_bytes(mut self, member: &str, bytes: &[u8]) -> Result<Self, SourceError> {
        let layout = self
            .layout
            .member(member)
            .ok_or_else(|| SourceError::InvalidValue {
                column: self.layout.name.clone(),
                message: format!("class has no member '{}'", member),
            })?;
        let start = usize::try_from(layout.offset).map_err(|_| SourceError::InvalidValue {
            column: self.layout.name.clone(),
            message: format!("member '{}' has negative offset", member),
        })?;
        let end = start.checked_add(bytes.len()).unwrap_or(usize::MAX);
        if bytes.len() > layout.size || end > self.bytes.len() {
            return Err(SourceError::InvalidValue {
                column: self.layout.name.clone(),
                message: format!(
                    "{} bytes do not fit member '{}' of size {}",
                    bytes.len(),
                    member,
                    layout.size
                ),
            });
        }
        self.bytes[start..end].copy_from_slice(bytes);
        Ok(self)
    }

    /// Returns the encoded object.
    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
