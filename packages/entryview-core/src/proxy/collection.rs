use crate::error::ReaderError;
use crate::types::{ClassKind, ClassLayout, CollectionKind, SchemaGeneration, TypeCatalog};

/// Uniform view over a container class: what it holds and how large each
/// held value is.
///
/// Generated from the catalog during resolution and owned by the proxy that
/// needed it. Dropped on every reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView {
    pub collection_class: String,
    pub kind: CollectionKind,
    pub value_class: String,
    pub value_size: usize,
}

impl CollectionView {
    /// Builds the view for `layout` as seen by `generation`.
    pub fn generate(
        layout: &ClassLayout,
        catalog: &dyn TypeCatalog,
        generation: SchemaGeneration,
        column: &str,
    ) -> Result<Self, ReaderError> {
        let (kind, value_class) = match &layout.kind {
            ClassKind::Collection {
                collection,
                value_class: Some(value_class),
            } => (*collection, value_class.clone()),
            ClassKind::Collection {
                value_class: None, ..
            } => {
                return Err(ReaderError::MissingMember {
                    column: column.to_string(),
                    member: "value type".to_string(),
                    class: layout.name.clone(),
                })
            }
            ClassKind::IndexedContainer { element_class } => {
                (CollectionKind::Sequence, element_class.clone())
            }
            ClassKind::Basic | ClassKind::Struct => {
                return Err(ReaderError::UnsupportedLayout {
                    column: column.to_string(),
                    reason: format!("class '{}' is not a container", layout.name),
                })
            }
        };

        let value_layout = catalog
            .class_layout(&value_class, generation)
            .ok_or_else(|| ReaderError::UnknownClass {
                column: column.to_string(),
                class: value_class.clone(),
            })?;

        Ok(Self {
            collection_class: layout.name.clone(),
            kind,
            value_class,
            value_size: value_layout.size,
        })
    }

    /// Returns `true` if `layout` is a container class.
    pub fn is_container(layout: &ClassLayout) -> bool {
        matches!(
            layout.kind,
            ClassKind::Collection { .. } | ClassKind::IndexedContainer { .. }
        )
    }
}
