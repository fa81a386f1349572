//! Shared fixtures for integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use entryview_core::source::{MemorySource, ObjectWriter, Source};
use entryview_core::types::{
    register_builtin_types, ClassLayout, ClassLayoutBuilder, CollectionKind, SchemaGeneration,
    TypeCatalog, TypeRegistry,
};
use entryview_core::Chain;

/// Registry with the built-in element types.
pub fn builtin_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_builtin_types(&registry).unwrap();
    registry
}

/// Registry describing a small event model:
///
/// - `Vec3 { x, y, z: f32 }`
/// - `Hit { e: f64, layer: i32 }` (16 bytes, stride larger than either member)
/// - `HitList`: sequence collection of `Hit`
/// - `Track { pt: f32, pos: Vec3, origin: *Vec3, hits: HitList }`
/// - `TrackList`: sequence collection of `Track`
pub fn event_registry() -> anyhow::Result<TypeRegistry> {
    let registry = builtin_registry();
    registry.register(
        ClassLayoutBuilder::new("Vec3")
            .field("x", "f32")
            .field("y", "f32")
            .field("z", "f32")
            .build(&registry, None)?,
    )?;
    registry.register(
        ClassLayoutBuilder::new("Hit")
            .field("e", "f64")
            .field("layer", "i32")
            .build(&registry, None)?,
    )?;
    registry.register(ClassLayout::collection(
        "HitList",
        CollectionKind::Sequence,
        Some("Hit".to_string()),
    ))?;
    registry.register(
        ClassLayoutBuilder::new("Track")
            .field("pt", "f32")
            .field("pos", "Vec3")
            .pointer("origin", "Vec3")
            .collection("hits", "HitList")
            .build(&registry, None)?,
    )?;
    registry.register(ClassLayout::collection(
        "TrackList",
        CollectionKind::Sequence,
        Some("Track".to_string()),
    ))?;
    Ok(registry)
}

pub fn layout(registry: &TypeRegistry, class: &str) -> ClassLayout {
    registry.get(class).unwrap()
}

pub fn hit(registry: &TypeRegistry, e: f64, layer: i32) -> Vec<u8> {
    ObjectWriter::new(&layout(registry, "Hit"))
        .set("e", e)
        .and_then(|w| w.set("layer", layer))
        .unwrap()
        .finish()
}

pub fn vec3(registry: &TypeRegistry, x: f32, y: f32, z: f32) -> Vec<u8> {
    ObjectWriter::new(&layout(registry, "Vec3"))
        .set("x", x)
        .and_then(|w| w.set("y", y))
        .and_then(|w| w.set("z", z))
        .unwrap()
        .finish()
}

/// Chain of sources, in order, each titled by its name.
pub fn chain_of(sources: Vec<MemorySource>) -> Chain {
    let mut chain = Chain::new();
    for source in sources {
        let title = source.name().to_string();
        chain.push(title, Arc::new(source));
    }
    chain
}

/// Type catalog counting every layout lookup.
#[derive(Debug, Default)]
pub struct CountingCatalog {
    inner: TypeRegistry,
    lookups: AtomicUsize,
}

impl CountingCatalog {
    pub fn new(inner: TypeRegistry) -> Self {
        Self {
            inner,
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl TypeCatalog for CountingCatalog {
    fn class_layout(&self, class: &str, generation: SchemaGeneration) -> Option<ClassLayout> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.class_layout(class, generation)
    }
}
