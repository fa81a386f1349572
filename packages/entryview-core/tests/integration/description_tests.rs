//! Chains loaded from JSON descriptions.

use std::sync::Arc;

use ntest::timeout;
use tempfile::tempdir;

use entryview_core::diagnostics::DiagnosticKind;
use entryview_core::source::ChainDescription;
use entryview_core::{EntryReader, EntryStatus, ReaderConfig};

use super::helpers::builtin_registry;

const RUNS: &str = r#"{"sources": [
    {"name": "run1", "columns": [
        {"name": "n", "type": "u8", "values": [2, 0]},
        {"name": "e", "type": "f64", "count_column": "n", "values": [[1.25, 2.5], []]},
        {"name": "ok", "type": "bool", "array_length": 3, "values": [[true, false, true], [false, false, true]]},
        {"name": "weight", "type": "f32", "values": [0.5, 0.75]}
    ], "read_errors": [["weight", 1]]},
    {"name": "run2", "columns": [
        {"name": "n", "type": "u8", "values": [1]},
        {"name": "e", "type": "f64", "count_column": "n", "values": [[9.5]]},
        {"name": "ok", "type": "bool", "array_length": 3, "values": [[true, true, true]]}
    ], "non_contiguous": ["e"]}
]}"#;

#[timeout(1000)]
#[test]
fn test_read_chain_from_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("runs.json");
    std::fs::write(&path, RUNS)?;

    let chain = ChainDescription::from_json_file(&path)?.build_chain()?;
    let mut entries = EntryReader::new(chain, Arc::new(builtin_registry()));
    let mut e = entries.array::<f64>("e");
    let mut ok = entries.bool_array("ok");
    let mut weight = entries.value::<f32>("weight");

    let mut energies = Vec::new();
    let mut flags = Vec::new();
    let mut weights = Vec::new();
    while entries.next() {
        let entry = entries.current_entry().unwrap_or_default();
        energies.push(e.get(entry)?.map(<[f64]>::to_vec));
        flags.push(ok.get(entry)?.map(<[bool]>::to_vec));
        weights.push(weight.get(entry)?.copied());
    }

    assert_eq!(
        energies,
        vec![Some(vec![1.25, 2.5]), Some(vec![]), Some(vec![9.5])]
    );
    assert_eq!(
        flags,
        vec![
            Some(vec![true, false, true]),
            Some(vec![false, false, true]),
            Some(vec![true, true, true]),
        ]
    );
    assert_eq!(weights, vec![Some(0.5), None, None]);

    let diagnostics = entries.director().diagnostics();
    assert_eq!(diagnostics.count(DiagnosticKind::ReadError), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::MissingColumn), 1);
    assert_eq!(diagnostics.count(DiagnosticKind::NonContiguousCopy), 1);
    Ok(())
}

#[timeout(1000)]
#[test]
fn test_config_file_suppresses_missing_columns() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("reader.json");
    std::fs::write(&path, r#"{"optional_columns": ["weight"], "warn_on_copy": false}"#)?;
    let config = ReaderConfig::from_json_file(&path)?;

    let chain = ChainDescription::from_json_str(RUNS)?.build_chain()?;
    let mut entries = EntryReader::with_config(chain, Arc::new(builtin_registry()), config);
    let mut weight = entries.value::<f32>("weight");

    assert_eq!(entries.set_entry(2), EntryStatus::Valid);
    assert_eq!(weight.get(2)?, None);
    assert_eq!(entries.set_entry(3), EntryStatus::EntryNotFound);
    assert_eq!(entries.director().diagnostics().total(), 0);
    Ok(())
}
