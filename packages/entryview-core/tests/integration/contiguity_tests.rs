//! In-place views over contiguous storage and the copy fallback.

use std::sync::Arc;

use ntest::timeout;

use entryview_core::diagnostics::DiagnosticKind;
use entryview_core::reader::{ArrayReader, ValueReader};
use entryview_core::source::{MemorySource, Source};
use entryview_core::{Chain, Director, ReaderConfig};

use super::helpers::builtin_registry;

const SAMPLES: [[f64; 4]; 3] = [
    [1.0, 2.0, 3.0, 4.0],
    [-1.5, 0.0, 1.5, 3.0],
    [1e-9, 1e9, f64::MAX, f64::MIN_POSITIVE],
];

fn samples_source(non_contiguous: bool) -> Arc<MemorySource> {
    let mut builder = MemorySource::builder("samples").fixed_array("v", &SAMPLES);
    if non_contiguous {
        builder = builder.non_contiguous("v");
    }
    Arc::new(builder.build().unwrap())
}

fn director_over(source: &Arc<MemorySource>, config: ReaderConfig) -> Director {
    let source: Arc<dyn Source> = source.clone();
    Director::with_config(
        Chain::single("samples", source),
        Arc::new(builtin_registry()),
        config,
    )
}

#[timeout(1000)]
#[test]
fn test_contiguous_array_is_viewed_in_place() {
    let source = samples_source(false);
    let director = director_over(&source, ReaderConfig::default());
    let mut v = ArrayReader::<f64>::new(director.clone(), director.proxy("v"));

    for (entry, expected) in SAMPLES.iter().enumerate() {
        let values = v.get(entry as u64).unwrap().unwrap();
        assert_eq!(values, expected);

        let stored = source.column_base("v", entry as u64).unwrap();
        assert_eq!(values.as_ptr() as *const u8, stored.as_bytes().as_ptr());
        assert!(v.is_view());
    }
    assert_eq!(director.diagnostics().total(), 0);
}

#[timeout(1000)]
#[test]
fn test_contiguous_scalar_is_viewed_in_place() {
    let source = Arc::new(
        MemorySource::builder("s")
            .scalar("w", &[7u64, 8, 9])
            .build()
            .unwrap(),
    );
    let director = director_over(&source, ReaderConfig::default());
    let mut w = ValueReader::<u64>::new(director.clone(), director.proxy("w"));

    let value = w.get(1).unwrap().unwrap();
    assert_eq!(*value, 8);
    assert_eq!(
        value as *const u64 as *const u8,
        source.column_base("w", 1).unwrap().as_bytes().as_ptr()
    );
}

#[timeout(1000)]
#[test]
fn test_non_contiguous_array_is_copied_with_one_diagnostic() {
    let source = samples_source(true);
    let director = director_over(&source, ReaderConfig::default());
    let mut v = ArrayReader::<f64>::new(director.clone(), director.proxy("v"));

    for _ in 0..3 {
        for (entry, expected) in SAMPLES.iter().enumerate() {
            let reference: Vec<f64> = expected.to_vec();
            let values = v.get(entry as u64).unwrap().unwrap();
            assert_eq!(values, reference.as_slice());

            let stored = source.column_base("v", entry as u64).unwrap();
            assert_ne!(values.as_ptr() as *const u8, stored.as_bytes().as_ptr());
        }
    }

    assert!(!v.is_view());
    assert_eq!(director.diagnostics().count(DiagnosticKind::NonContiguousCopy), 1);
    let recorded = director.diagnostics().recent();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].column, "v");
    assert_eq!(recorded[0].source_name.as_deref(), Some("samples"));
}

#[timeout(1000)]
#[test]
fn test_each_reader_reports_its_own_copy() {
    let source = samples_source(true);
    let director = director_over(&source, ReaderConfig::default());
    let mut a = ArrayReader::<f64>::new(director.clone(), director.proxy("v"));
    let mut b = ArrayReader::<f64>::new(director.clone(), director.proxy("v"));

    a.get(0).unwrap();
    a.get(1).unwrap();
    b.get(0).unwrap();

    assert_eq!(director.diagnostics().count(DiagnosticKind::NonContiguousCopy), 2);
}

#[timeout(1000)]
#[test]
fn test_copy_warning_can_be_disabled() {
    let source = samples_source(true);
    let config = ReaderConfig::from_json_str(r#"{"warn_on_copy": false}"#).unwrap();
    let director = director_over(&source, config);
    let mut v = ArrayReader::<f64>::new(director.clone(), director.proxy("v"));

    assert_eq!(v.get(2).unwrap().unwrap(), &SAMPLES[2]);
    assert_eq!(director.diagnostics().total(), 0);
}
