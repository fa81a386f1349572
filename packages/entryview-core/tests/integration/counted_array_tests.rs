//! Arrays whose per-entry length comes from a count column.

use std::sync::Arc;

use ntest::timeout;

use entryview_core::diagnostics::DiagnosticKind;
use entryview_core::reader::{ArrayReader, SetupStatus};
use entryview_core::source::{MemorySource, ReadStatus};
use entryview_core::{Director, ReaderError};

use super::helpers::{builtin_registry, chain_of};

fn counted_source(non_contiguous: bool) -> MemorySource {
    let counts = [4u16, 1, 2, 0, 5, 0, 3];
    let values: Vec<Vec<f32>> = counts
        .iter()
        .enumerate()
        .map(|(entry, &n)| (0..n).map(|i| (entry * 10) as f32 + f32::from(i)).collect())
        .collect();
    let mut builder = MemorySource::builder("counted")
        .scalar("n", &counts)
        .counted_array("e", "n", &values);
    if non_contiguous {
        builder = builder.non_contiguous("e");
    }
    builder.build().unwrap()
}

fn reader_over(source: MemorySource) -> (Director, ArrayReader<f32>) {
    let director = Director::new(chain_of(vec![source]), Arc::new(builtin_registry()));
    let reader = ArrayReader::new(director.clone(), director.proxy("e"));
    (director, reader)
}

fn check_empty_then_three(reader: &mut ArrayReader<f32>) {
    assert_eq!(reader.get(4).unwrap().unwrap().len(), 5);
    assert_eq!(reader.get(5).unwrap(), Some(&[][..]));
    assert_eq!(reader.get(6).unwrap(), Some(&[60.0f32, 61.0, 62.0][..]));
    assert_eq!(reader.get(5).unwrap(), Some(&[][..]));
    assert_eq!(reader.get(0).unwrap(), Some(&[0.0f32, 1.0, 2.0, 3.0][..]));
    assert_eq!(reader.get(1).unwrap(), Some(&[10.0f32][..]));
}

#[timeout(1000)]
#[test]
fn test_counted_lengths_in_place() {
    let (director, mut e) = reader_over(counted_source(false));
    check_empty_then_three(&mut e);
    assert_eq!(e.setup_status(), SetupStatus::Match);
    assert_eq!(director.diagnostics().total(), 0);
}

#[timeout(1000)]
#[test]
fn test_counted_lengths_copied_without_stale_tail() {
    let (director, mut e) = reader_over(counted_source(true));
    check_empty_then_three(&mut e);
    assert!(!e.is_view());
    assert_eq!(director.diagnostics().count(DiagnosticKind::NonContiguousCopy), 1);
}

#[timeout(1000)]
#[test]
fn test_count_column_attached_once() {
    let (director, mut e) = reader_over(counted_source(false));
    for entry in 0..7 {
        e.get(entry).unwrap();
    }
    // "e" and its count provider "n"
    assert_eq!(director.attached_count(), 2);
    assert!(director.proxy("n").borrow().is_resolved());
}

#[timeout(1000)]
#[test]
fn test_counted_array_type_mismatch() {
    let (director, _) = reader_over(counted_source(false));
    let mut wrong = ArrayReader::<f64>::new(director.clone(), director.proxy("e"));

    let err = wrong.get(0).unwrap_err();
    assert_eq!(
        err,
        ReaderError::TypeMismatch {
            column: "e".to_string(),
            expected: "array of f64".to_string(),
            got: "array[n] of f32".to_string(),
        }
    );
}

#[timeout(1000)]
#[test]
fn test_unreadable_count_column_yields_no_value() {
    let source = MemorySource::builder("counted")
        .scalar("n", &[2u16, 1])
        .counted_array("e", "n", &[vec![1.0f32, 2.0], vec![3.0]])
        .read_error("n", 0)
        .build()
        .unwrap();
    let (director, mut e) = reader_over(source);

    assert_eq!(e.get(0).unwrap(), None);
    assert_eq!(e.read_status(), ReadStatus::Error);
    assert_eq!(director.diagnostics().count(DiagnosticKind::ReadError), 1);

    assert_eq!(e.get(1).unwrap(), Some(&[3.0f32][..]));
    assert_eq!(e.get(0).unwrap(), None);
}
