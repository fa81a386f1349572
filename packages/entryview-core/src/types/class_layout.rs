use serde::{Deserialize, Serialize};

use super::element::basic_type_size;
use super::error::CatalogError;
use super::type_registry::TypeRegistry;
use super::SchemaGeneration;

/// Size in bytes of an object handle stored for pointer and collection members.
pub const HANDLE_SIZE: usize = 8;

/// Container flavour exposed through the collection abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Sequence,
    Set,
    Map,
}

/// What kind of class a layout describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassKind {
    /// Basic element type (numbers, bool)
    Basic,
    /// Plain aggregate with named members
    Struct,
    /// Fixed-element-class container wrapper; members resolve against the element class
    IndexedContainer { element_class: String },
    /// Sequence, set or map exposed through one interface
    Collection {
        collection: CollectionKind,
        value_class: Option<String>,
    },
}

/// Layout of one data member within a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLayout {
    /// Member name
    pub name: String,
    /// Declared type name (element type for arrays)
    pub type_name: String,
    /// Byte offset within the owning class. Foreign layouts may carry
    /// negative values, which readers treat as invalid.
    pub offset: i64,
    /// Total size in bytes (all array elements, or one handle)
    pub size: usize,
    /// Number of elements for fixed arrays, 1 otherwise
    #[serde(default = "default_array_length")]
    pub array_length: usize,
    /// Member holds a handle to an object rather than the object itself
    #[serde(default)]
    pub is_pointer: bool,
    /// Member holds a handle to a collection block
    #[serde(default)]
    pub is_collection: bool,
    /// Concrete class when it differs from the declared type
    #[serde(default)]
    pub concrete_class: Option<String>,
}

fn default_array_length() -> usize {
    1
}

impl MemberLayout {
    /// Returns the class actually stored in this member.
    pub fn runtime_class(&self) -> &str {
        self.concrete_class.as_deref().unwrap_or(&self.type_name)
    }

    /// Returns the size of one array element.
    pub fn element_size(&self) -> usize {
        self.size / self.array_length.max(1)
    }

    /// Returns the end offset of this member (offset + size), if the offset is valid.
    pub fn end_offset(&self) -> Option<usize> {
        usize::try_from(self.offset).ok()?.checked_add(self.size)
    }
}

/// Layout of a class as seen by one schema generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLayout {
    /// Class name
    pub name: String,
    /// Size in bytes
    pub size: usize,
    /// Alignment requirement in bytes
    pub align: usize,
    /// Class category
    pub kind: ClassKind,
    /// Data members in declaration order
    #[serde(default)]
    pub members: Vec<MemberLayout>,
}

impl ClassLayout {
    /// Creates a basic element type layout.
    pub fn basic(name: impl Into<String>, size: usize, align: usize) -> Self {
        Self {
            name: name.into(),
            size,
            align,
            kind: ClassKind::Basic,
            members: Vec::new(),
        }
    }

    /// Creates a collection class layout. Collections are stored as handles.
    pub fn collection(
        name: impl Into<String>,
        collection: CollectionKind,
        value_class: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size: HANDLE_SIZE,
            align: HANDLE_SIZE,
            kind: ClassKind::Collection {
                collection,
                value_class,
            },
            members: Vec::new(),
        }
    }

    /// Creates an indexed container wrapper layout.
    pub fn indexed_container(name: impl Into<String>, element_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: HANDLE_SIZE,
            align: HANDLE_SIZE,
            kind: ClassKind::IndexedContainer {
                element_class: element_class.into(),
            },
            members: Vec::new(),
        }
    }

    /// Returns the member with the given name.
    pub fn member(&self, name: &str) -> Option<&MemberLayout> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Validates that the layout is consistent.
    ///
    /// # Returns
    /// `Ok(())` if valid, `Err(CatalogError)` otherwise.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.align == 0 {
            return Err(CatalogError::InvalidAlignment {
                class: self.name.clone(),
                align: self.align,
            });
        }

        if self.size > 0 && self.size % self.align != 0 {
            return Err(CatalogError::SizeAlignmentMismatch {
                class: self.name.clone(),
                size: self.size,
                align: self.align,
            });
        }

        let mut seen = std::collections::HashSet::new();
        for member in &self.members {
            if !seen.insert(member.name.as_str()) {
                return Err(CatalogError::DuplicateMember {
                    class: self.name.clone(),
                    member: member.name.clone(),
                });
            }
            match member.end_offset() {
                Some(end) if end <= self.size => {}
                _ => {
                    return Err(CatalogError::MemberExceedsClassSize {
                        class: self.name.clone(),
                        member: member.name.clone(),
                        offset: member.offset,
                        size: member.size,
                        class_size: self.size,
                    })
                }
            }
            if member.is_pointer || member.is_collection {
                continue;
            }
            let expected = basic_type_size(&member.type_name)
                .and_then(|size| size.checked_mul(member.array_length.max(1)));
            if let Some(expected) = expected.filter(|expected| *expected != member.size) {
                return Err(CatalogError::MemberSizeMismatch {
                    class: self.name.clone(),
                    member: member.name.clone(),
                    size: member.size,
                    expected,
                });
            }
        }

        Ok(())
    }
}

/// Aligns an offset to the given alignment.
pub(crate) fn align_offset(offset: usize, align: usize) -> usize {
    if align == 0 {
        return offset;
    }
    let remainder = offset % align;
    if remainder == 0 {
        offset
    } else {
        offset + (align - remainder)
    }
}

enum PendingMember {
    Value { type_name: String, array_length: usize },
    Pointer { class: String },
    Collection { class: String },
}

/// Builds struct layouts with naturally aligned member offsets.
///
/// Member sizes are taken from classes already known to the registry,
/// so nested structs must be registered before the classes embedding them.
pub struct ClassLayoutBuilder {
    name: String,
    members: Vec<(String, PendingMember)>,
}

impl ClassLayoutBuilder {
    /// Starts a struct layout.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Adds a member stored by value (basic type or embedded struct).
    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.members.push((
            name.into(),
            PendingMember::Value {
                type_name: type_name.into(),
                array_length: 1,
            },
        ));
        self
    }

    /// Adds a fixed-length array member.
    pub fn array(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
        array_length: usize,
    ) -> Self {
        self.members.push((
            name.into(),
            PendingMember::Value {
                type_name: type_name.into(),
                array_length,
            },
        ));
        self
    }

    /// Adds a member holding a handle to an object of `class`.
    pub fn pointer(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.members.push((
            name.into(),
            PendingMember::Pointer {
                class: class.into(),
            },
        ));
        self
    }

    /// Adds a member holding a handle to a collection of class `class`.
    pub fn collection(mut self, name: impl Into<String>, class: impl Into<String>) -> Self {
        self.members.push((
            name.into(),
            PendingMember::Collection {
                class: class.into(),
            },
        ));
        self
    }

    /// Computes offsets against the layouts visible at `generation`.
    pub fn build(
        self,
        registry: &TypeRegistry,
        generation: Option<SchemaGeneration>,
    ) -> Result<ClassLayout, CatalogError> {
        let mut offset = 0usize;
        let mut max_align = 1usize;
        let mut members = Vec::with_capacity(self.members.len());

        for (name, pending) in self.members {
            let (type_name, size, align, array_length, is_pointer, is_collection) = match pending
            {
                PendingMember::Value {
                    type_name,
                    array_length,
                } => {
                    let layout = registry.lookup(&type_name, generation).ok_or_else(|| {
                        CatalogError::NotFound {
                            class: type_name.clone(),
                        }
                    })?;
                    let size = layout.size.checked_mul(array_length).ok_or_else(|| {
                        CatalogError::ValidationFailed {
                            class: self.name.clone(),
                            message: format!("array member '{}' size overflow", name),
                        }
                    })?;
                    (type_name, size, layout.align, array_length, false, false)
                }
                PendingMember::Pointer { class } => (class, HANDLE_SIZE, HANDLE_SIZE, 1, true, false),
                PendingMember::Collection { class } => {
                    (class, HANDLE_SIZE, HANDLE_SIZE, 1, false, true)
                }
            };

            offset = align_offset(offset, align);
            max_align = max_align.max(align);
            members.push(MemberLayout {
                name,
                type_name,
                offset: offset as i64,
                size,
                array_length,
                is_pointer,
                is_collection,
                concrete_class: None,
            });
            offset += size;
        }

        let layout = ClassLayout {
            name: self.name,
            size: align_offset(offset, max_align),
            align: max_align,
            kind: ClassKind::Struct,
            members,
        };
        layout.validate()?;
        Ok(layout)
    }
}
