//! Type catalog: class layouts, element types and the registry resolving
//! member names to byte offsets per schema generation.

pub mod builtin_types;
pub mod catalog;
pub mod class_layout;
pub mod element;
pub mod error;
pub mod type_registry;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use builtin_types::{basic_layout, register_builtin_types};
pub use catalog::TypeCatalog;
pub use class_layout::{
    ClassKind, ClassLayout, ClassLayoutBuilder, CollectionKind, MemberLayout, HANDLE_SIZE,
};
pub use element::Element;
pub use error::CatalogError;
pub use type_registry::TypeRegistry;

/// Identifies the schema a source was written with.
///
/// Sources with equal generations share class layouts; the catalog may
/// answer differently for different generations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaGeneration(pub u64);

impl fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}
