//! Members of objects, pointed-to objects, collections and containers.

use std::rc::Rc;
use std::sync::Arc;

use ntest::timeout;

use entryview_core::diagnostics::DiagnosticKind;
use entryview_core::reader::{ArrayReader, FixedArrayReader, SetupStatus, ValueReader};
use entryview_core::source::{MemorySource, ObjectHandle, ObjectWriter};
use entryview_core::types::{CatalogError, ClassKind, ClassLayout, MemberLayout, TypeRegistry};
use entryview_core::{Director, EntryReader, ReaderError};

use super::helpers::{builtin_registry, chain_of, event_registry, hit, layout, vec3};

fn track(
    registry: &TypeRegistry,
    pt: f32,
    pos: (f32, f32, f32),
    origin: ObjectHandle,
    hits: ObjectHandle,
) -> Vec<u8> {
    ObjectWriter::new(&layout(registry, "Track"))
        .set("pt", pt)
        .and_then(|w| w.set_bytes("pos", &vec3(registry, pos.0, pos.1, pos.2)))
        .and_then(|w| w.set_handle("origin", origin))
        .and_then(|w| w.set_handle("hits", hits))
        .unwrap()
        .finish()
}

/// Three entries:
/// 0. origin set, three hits
/// 1. null origin, null hit list
/// 2. origin set, one hit
fn event_source(registry: &TypeRegistry) -> MemorySource {
    let mut builder = MemorySource::builder("events");
    let origin = builder.alloc(vec3(registry, 0.1, 0.2, 0.3));
    let three_hits = builder.alloc_block(&[
        hit(registry, 1.5, 1),
        hit(registry, 2.5, 2),
        hit(registry, 3.5, 3),
    ]);
    let one_hit = builder.alloc_block(&[hit(registry, 9.0, 7)]);

    let tracks = vec![
        track(registry, 10.0, (1.0, 2.0, 3.0), origin, three_hits),
        track(registry, 20.0, (4.0, 5.0, 6.0), ObjectHandle::NULL, ObjectHandle::NULL),
        track(registry, 30.0, (7.0, 8.0, 9.0), origin, one_hit),
    ];
    let track_lists = vec![
        vec![tracks[0].clone(), tracks[1].clone()],
        vec![],
        vec![tracks[2].clone()],
    ];

    builder
        .object("track", "Track", tracks)
        .indexed_container(
            "hitvec",
            "Hit",
            &[
                vec![hit(registry, 0.5, 4), hit(registry, 0.25, 5)],
                vec![],
                vec![hit(registry, 0.125, 6)],
            ],
        )
        .collection(
            "hitlist",
            "HitList",
            &[vec![hit(registry, 1.0, 1)], vec![hit(registry, 2.0, 2)], vec![]],
        )
        .collection("tracks", "TrackList", &track_lists)
        .build()
        .unwrap()
}

fn event_reader() -> EntryReader {
    let registry = event_registry().unwrap();
    let source = event_source(&registry);
    EntryReader::new(chain_of(vec![source]), Arc::new(registry))
}

fn collect_values<T: entryview_core::types::Element>(
    reader: &mut ValueReader<T>,
    entries: u64,
) -> Vec<Option<T>> {
    (0..entries)
        .map(|entry| reader.get(entry).unwrap().copied())
        .collect()
}

fn collect_arrays<T: entryview_core::types::Element>(
    reader: &mut ArrayReader<T>,
    entries: u64,
) -> Vec<Option<Vec<T>>> {
    (0..entries)
        .map(|entry| reader.get(entry).unwrap().map(<[T]>::to_vec))
        .collect()
}

#[timeout(1000)]
#[test]
fn test_object_members() {
    let entries = event_reader();
    let mut pt = entries.value::<f32>("track.pt");
    let mut y = entries.value::<f32>("track.pos.y");

    assert_eq!(collect_values(&mut pt, 3), vec![Some(10.0), Some(20.0), Some(30.0)]);
    assert_eq!(collect_values(&mut y, 3), vec![Some(2.0), Some(5.0), Some(8.0)]);
    assert!(pt.is_view());
    assert_eq!(entries.director().diagnostics().total(), 0);
}

#[timeout(1000)]
#[test]
fn test_member_proxies_of_object_column() {
    let entries = event_reader();
    let track = entries.proxy("track");
    let pos = entries.director().member_proxy(&track, "pos");
    let mut z = entries.member_value::<f32>(&pos, "z");

    assert_eq!(collect_values(&mut z, 3), vec![Some(3.0), Some(6.0), Some(9.0)]);
    assert!(Rc::ptr_eq(&pos, &entries.director().member_proxy(&track, "pos")));
    assert_eq!(z.proxy().borrow().path(), "track.pos.z");
}

#[timeout(1000)]
#[test]
fn test_pointer_member() {
    let entries = event_reader();
    let origin = entries.proxy("track.origin");
    let mut z = entries.member_value::<f32>(&origin, "z");

    assert_eq!(collect_values(&mut z, 3), vec![Some(0.3), None, Some(0.3)]);

    let diagnostics = entries.director().diagnostics();
    assert_eq!(diagnostics.count(DiagnosticKind::ReadError), 1);
    assert!(diagnostics.recent()[0].message.contains("null object handle"));
}

#[timeout(1000)]
#[test]
fn test_fixed_array_member() {
    let registry = builtin_registry();
    registry
        .register(
            entryview_core::types::ClassLayoutBuilder::new("Cluster")
                .field("id", "u32")
                .array("cells", "i16", 3)
                .build(&registry, None)
                .unwrap(),
        )
        .unwrap();
    let cluster = ObjectWriter::new(&registry.get("Cluster").unwrap())
        .set("id", 7u32)
        .and_then(|w| w.set_array("cells", &[1i16, -2, 3]))
        .unwrap()
        .finish();
    let source = MemorySource::builder("clusters")
        .object("cluster", "Cluster", vec![cluster])
        .build()
        .unwrap();
    let entries = EntryReader::new(chain_of(vec![source]), Arc::new(registry));

    let mut cells: FixedArrayReader<i16, 3> = entries.fixed_array("cluster.cells");
    assert_eq!(cells.get(0).unwrap(), Some(&[1, -2, 3]));
    let mut as_array = entries.array::<i16>("cluster.cells");
    assert_eq!(as_array.get(0).unwrap(), Some(&[1i16, -2, 3][..]));
}

#[timeout(1000)]
#[test]
fn test_collection_member_of_object() {
    let entries = event_reader();
    let hits = entries.proxy("track.hits");
    let mut e = entries.member_array::<f64>(&hits, "e");
    let mut layer = entries.member_array::<i32>(&hits, "layer");

    assert_eq!(
        collect_arrays(&mut e, 3),
        vec![Some(vec![1.5, 2.5, 3.5]), Some(vec![]), Some(vec![9.0])]
    );
    assert_eq!(
        collect_arrays(&mut layer, 3),
        vec![Some(vec![1, 2, 3]), Some(vec![]), Some(vec![7])]
    );

    // strided member values are copied, once reported per reader
    let diagnostics = entries.director().diagnostics();
    assert_eq!(diagnostics.count(DiagnosticKind::NonContiguousCopy), 2);
    assert_eq!(diagnostics.count(DiagnosticKind::ReadError), 0);
    let hits_view = hits.borrow().collection().cloned().unwrap();
    assert_eq!(hits_view.value_class, "Hit");
    let e_view = e.proxy().borrow().collection().cloned().unwrap();
    assert_eq!(e_view.value_class, "Hit");
    assert_eq!(e_view.value_size, 16);
}

#[timeout(1000)]
#[test]
fn test_indexed_container_members() {
    let entries = event_reader();
    let mut e = entries.array::<f64>("hitvec.e");
    let mut layer = entries.array::<i32>("hitvec.layer");

    assert_eq!(
        collect_arrays(&mut e, 3),
        vec![Some(vec![0.5, 0.25]), Some(vec![]), Some(vec![0.125])]
    );
    assert_eq!(
        collect_arrays(&mut layer, 3),
        vec![Some(vec![4, 5]), Some(vec![]), Some(vec![6])]
    );
}

#[timeout(1000)]
#[test]
fn test_collection_column() {
    let entries = event_reader();
    let mut layer = entries.array::<i32>("hitlist.layer");
    assert_eq!(
        collect_arrays(&mut layer, 3),
        vec![Some(vec![1]), Some(vec![2]), Some(vec![])]
    );

    let mut whole = entries.array::<f64>("hitlist");
    assert!(matches!(
        whole.get(0),
        Err(ReaderError::TypeMismatch { ref got, .. }) if got == "collection of Hit"
    ));

    let view = whole.proxy().borrow().collection().cloned().unwrap();
    assert_eq!(view.value_class, "Hit");
    assert_eq!(view.value_size, 16);
}

#[timeout(1000)]
#[test]
fn test_collection_of_objects() {
    let entries = event_reader();
    let mut pt = entries.array::<f32>("tracks.pt");
    let mut y = entries.array::<f32>("tracks.pos.y");

    assert_eq!(
        collect_arrays(&mut pt, 3),
        vec![Some(vec![10.0, 20.0]), Some(vec![]), Some(vec![30.0])]
    );
    assert_eq!(
        collect_arrays(&mut y, 3),
        vec![Some(vec![2.0, 5.0]), Some(vec![]), Some(vec![8.0])]
    );
}

#[timeout(1000)]
#[test]
fn test_nested_collection_is_unsupported() {
    let entries = event_reader();
    let mut nested = entries.array::<f64>("tracks.hits");

    assert_eq!(nested.get(0).unwrap(), None);
    assert_eq!(nested.get(2).unwrap(), None);
    assert_eq!(
        entries.director().diagnostics().count(DiagnosticKind::MissingMember),
        1
    );
}

#[timeout(1000)]
#[test]
fn test_missing_member_reported_once() {
    let entries = event_reader();
    let mut mass = entries.value::<f32>("track.mass");

    assert_eq!(collect_values(&mut mass, 3), vec![None, None, None]);
    let diagnostics = entries.director().diagnostics();
    assert_eq!(diagnostics.count(DiagnosticKind::MissingMember), 1);
    assert!(diagnostics.recent()[0].message.contains("'mass'"));
}

fn broken_layout(offset: i64) -> ClassLayout {
    ClassLayout {
        name: "Broken".to_string(),
        size: 8,
        align: 4,
        kind: ClassKind::Struct,
        members: vec![MemberLayout {
            name: "x".to_string(),
            type_name: "f32".to_string(),
            offset,
            size: 4,
            array_length: 1,
            is_pointer: false,
            is_collection: false,
            concrete_class: None,
        }],
    }
}

#[timeout(1000)]
#[test]
fn test_invalid_offsets_fall_back_to_zero() {
    for offset in [-4i64, 6, 64] {
        let registry = builtin_registry();
        registry
            .register_unchecked(None, broken_layout(offset))
            .unwrap();
        let mut bytes = 1.5f32.to_ne_bytes().to_vec();
        bytes.extend_from_slice(&2.5f32.to_ne_bytes());
        let source = MemorySource::builder("broken")
            .object("b", "Broken", vec![bytes])
            .build()
            .unwrap();
        let director = Director::new(chain_of(vec![source]), Arc::new(registry));
        let mut x = ValueReader::<f32>::new(director.clone(), director.proxy("b.x"));

        assert_eq!(x.get(0).unwrap(), Some(&1.5), "offset {}", offset);
        assert_eq!(
            director.diagnostics().count(DiagnosticKind::InvalidOffset),
            1,
            "offset {}",
            offset
        );
    }
}

fn narrow_layout() -> ClassLayout {
    ClassLayout {
        name: "Narrow".to_string(),
        size: 8,
        align: 8,
        kind: ClassKind::Struct,
        members: vec![MemberLayout {
            name: "x".to_string(),
            type_name: "f64".to_string(),
            offset: 0,
            size: 4,
            array_length: 1,
            is_pointer: false,
            is_collection: false,
            concrete_class: None,
        }],
    }
}

#[timeout(1000)]
#[test]
fn test_member_narrower_than_its_type_is_rejected() {
    let registry = builtin_registry();
    assert!(matches!(
        registry.register(narrow_layout()),
        Err(CatalogError::MemberSizeMismatch { expected: 8, size: 4, .. })
    ));

    registry.register_unchecked(None, narrow_layout()).unwrap();
    let source = MemorySource::builder("narrow")
        .object("n", "Narrow", vec![2.5f64.to_ne_bytes().to_vec(); 2])
        .build()
        .unwrap();
    let director = Director::new(chain_of(vec![source]), Arc::new(registry));
    let mut x = ValueReader::<f64>::new(director.clone(), director.proxy("n.x"));

    assert_eq!(x.get(0).unwrap(), None);
    assert_eq!(x.get(1).unwrap(), None);
    assert_eq!(x.setup_status(), SetupStatus::Unresolved);
    assert_eq!(
        director.diagnostics().count(DiagnosticKind::MissingMember),
        1
    );
}
