use std::collections::HashMap;
use std::sync::RwLock;

use super::catalog::TypeCatalog;
use super::class_layout::ClassLayout;
use super::error::CatalogError;
use super::SchemaGeneration;

#[derive(Debug, Default)]
struct RegistryInner {
    classes: HashMap<String, ClassLayout>,
    versions: HashMap<(String, SchemaGeneration), ClassLayout>,
}

/// Registry for class layouts.
///
/// Stores one default layout per class plus per-generation overrides, so
/// sources written with an evolved class see their own member offsets.
/// Provides thread-safe registration and retrieval.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    inner: RwLock<RegistryInner>,
}

impl TypeRegistry {
    /// Creates a new empty type registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Registers the default layout of a class.
    ///
    /// # Returns
    /// `Ok(())` if successful, `Err(CatalogError)` if the class is already
    /// registered or the layout is invalid.
    pub fn register(&self, layout: ClassLayout) -> Result<(), CatalogError> {
        layout.validate()?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| CatalogError::ValidationFailed {
                class: layout.name.clone(),
                message: "failed to acquire write lock".to_string(),
            })?;

        if inner.classes.contains_key(&layout.name) {
            return Err(CatalogError::AlreadyRegistered {
                class: layout.name.clone(),
            });
        }

        inner.classes.insert(layout.name.clone(), layout);
        Ok(())
    }

    /// Registers the layout a class has in one schema generation.
    ///
    /// Replaces any layout previously registered for the same generation.
    pub fn register_version(
        &self,
        generation: SchemaGeneration,
        layout: ClassLayout,
    ) -> Result<(), CatalogError> {
        layout.validate()?;
        self.insert_version(generation, layout)
    }

    /// Registers a layout loaded from a foreign schema description without
    /// validating member bounds. Readers guard against bad offsets.
    pub fn register_unchecked(
        &self,
        generation: Option<SchemaGeneration>,
        layout: ClassLayout,
    ) -> Result<(), CatalogError> {
        if layout.align == 0 {
            return Err(CatalogError::InvalidAlignment {
                class: layout.name.clone(),
                align: layout.align,
            });
        }

        match generation {
            Some(generation) => self.insert_version(generation, layout),
            None => {
                let mut inner = self
                    .inner
                    .write()
                    .map_err(|_| CatalogError::ValidationFailed {
                        class: layout.name.clone(),
                        message: "failed to acquire write lock".to_string(),
                    })?;
                inner.classes.insert(layout.name.clone(), layout);
                Ok(())
            }
        }
    }

    fn insert_version(
        &self,
        generation: SchemaGeneration,
        layout: ClassLayout,
    ) -> Result<(), CatalogError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| CatalogError::ValidationFailed {
                class: layout.name.clone(),
                message: "failed to acquire write lock".to_string(),
            })?;
        inner
            .versions
            .insert((layout.name.clone(), generation), layout);
        Ok(())
    }

    /// Retrieves a class layout, preferring the override for `generation`.
    pub fn lookup(&self, class: &str, generation: Option<SchemaGeneration>) -> Option<ClassLayout> {
        let inner = self.inner.read().ok()?;
        if let Some(generation) = generation {
            if let Some(layout) = inner.versions.get(&(class.to_string(), generation)) {
                return Some(layout.clone());
            }
        }
        inner.classes.get(class).cloned()
    }

    /// Retrieves the default layout of a class.
    pub fn get(&self, class: &str) -> Option<ClassLayout> {
        self.lookup(class, None)
    }

    /// Checks if a class has a default layout.
    pub fn contains(&self, class: &str) -> bool {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        inner.classes.contains_key(class)
    }

    /// Returns all classes with a default layout.
    pub fn class_names(&self) -> Vec<String> {
        let inner = match self.inner.read() {
            Ok(guard) => guard,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = inner.classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Removes a class and all of its versions.
    ///
    /// # Returns
    /// `true` if the class was removed, `false` if it wasn't found.
    pub fn remove(&self, class: &str) -> bool {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(_) => return false,
        };
        inner.versions.retain(|(name, _), _| name != class);
        inner.classes.remove(class).is_some()
    }

    /// Validates that a class is registered and matches expected properties.
    ///
    /// # Arguments
    /// * `class` - Class name
    /// * `expected_size` - Expected size in bytes (optional)
    /// * `expected_align` - Expected alignment in bytes (optional)
    ///
    /// # Returns
    /// `Ok(ClassLayout)` if validation passes, `Err(CatalogError)` otherwise.
    pub fn validate_class(
        &self,
        class: &str,
        expected_size: Option<usize>,
        expected_align: Option<usize>,
    ) -> Result<ClassLayout, CatalogError> {
        let layout = self.get(class).ok_or_else(|| CatalogError::NotFound {
            class: class.to_string(),
        })?;

        if let Some(size) = expected_size {
            if layout.size != size {
                return Err(CatalogError::ValidationFailed {
                    class: class.to_string(),
                    message: format!("size mismatch: expected {}, got {}", size, layout.size),
                });
            }
        }

        if let Some(align) = expected_align {
            if layout.align != align {
                return Err(CatalogError::ValidationFailed {
                    class: class.to_string(),
                    message: format!(
                        "alignment mismatch: expected {}, got {}",
                        align, layout.align
                    ),
                });
            }
        }

        Ok(layout)
    }
}

impl TypeCatalog for TypeRegistry {
    fn class_layout(&self, class: &str, generation: SchemaGeneration) -> Option<ClassLayout> {
        self.lookup(class, Some(generation))
    }
}
