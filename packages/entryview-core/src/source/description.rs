//! JSON description of in-memory sources.
//!
//! ```json
//! {"sources": [{"name": "run1", "columns": [
//!     {"name": "n", "type": "i32", "values": [0, 2]},
//!     {"name": "e", "type": "f64", "count_column": "n", "values": [[], [1.5, 2.5]]}
//! ]}]}
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::Chain;
use crate::error::SourceError;
use crate::types::element::basic_type_size;
use crate::types::{Element, SchemaGeneration};

use super::memory::{MemorySource, MemorySourceBuilder};

/// Numeric leaf column with its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Fixed array length; entries are then arrays of this length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_length: Option<usize>,
    /// Column holding per-entry lengths; entries are then arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_column: Option<String>,
    pub values: Vec<Value>,
}

/// One source of a chain description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescription {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<SchemaGeneration>,
    pub columns: Vec<ColumnDescription>,
    /// `(column, entry)` pairs that fail to read
    #[serde(default)]
    pub read_errors: Vec<(String, u64)>,
    #[serde(default)]
    pub non_contiguous: Vec<String>,
}

/// Ordered list of source descriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDescription {
    pub sources: Vec<SourceDescription>,
}

impl ChainDescription {
    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        serde_json::from_str(json).map_err(|e| SourceError::InvalidDescription(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SourceError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&contents)
    }

    /// Builds every source and chains them in order.
    pub fn build_chain(&self) -> Result<Chain, SourceError> {
        let mut chain = Chain::new();
        for description in &self.sources {
            let source = description.build()?;
            chain.push(description.name.clone(), Arc::new(source));
        }
        Ok(chain)
    }
}

impl SourceDescription {
    /// Builds the described source.
    pub fn build(&self) -> Result<MemorySource, SourceError> {
        let mut builder = MemorySourceBuilder::new(self.name.clone());
        if let Some(generation) = self.generation {
            builder = builder.generation(generation);
        }

        for column in &self.columns {
            let entries = column
                .values
                .iter()
                .map(|value| encode_entry(column, value))
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.leaf(
                column.name.clone(),
                column.type_name.clone(),
                column.array_length.unwrap_or(1),
                column.count_column.clone(),
                entries,
            );
        }

        for (column, entry) in &self.read_errors {
            builder = builder.read_error(column.clone(), *entry);
        }
        for column in &self.non_contiguous {
            builder = builder.non_contiguous(column.clone());
        }
        builder.build()
    }
}

fn encode_entry(column: &ColumnDescription, value: &Value) -> Result<Vec<u8>, SourceError> {
    let invalid = |message: String| SourceError::InvalidValue {
        column: column.name.clone(),
        message,
    };
    if basic_type_size(&column.type_name).is_none() {
        return Err(SourceError::UnknownType {
            column: column.name.clone(),
            type_name: column.type_name.clone(),
        });
    }

    let mut out = Vec::new();
    let is_array = column.count_column.is_some() || column.array_length.is_some();
    if !is_array {
        encode_value(&column.type_name, value, &mut out).map_err(invalid)?;
        return Ok(out);
    }

    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("expected an array, got {}", value)))?;
    if let Some(length) = column.array_length {
        if items.len() != length {
            return Err(invalid(format!(
                "expected {} elements, got {}",
                length,
                items.len()
            )));
        }
    }
    for item in items {
        encode_value(&column.type_name, item, &mut out).map_err(invalid)?;
    }
    Ok(out)
}

fn encode_value(type_name: &str, value: &Value, out: &mut Vec<u8>) -> Result<(), String> {
    fn int<T: TryFrom<i64> + TryFrom<u64> + Element>(value: &Value) -> Result<T, String> {
        let converted = match (value.as_i64(), value.as_u64()) {
            (Some(v), _) => T::try_from(v).ok(),
            (None, Some(v)) => T::try_from(v).ok(),
            _ => None,
        };
        converted.ok_or_else(|| format!("{} is not a valid {}", value, T::TYPE_NAME))
    }
    let float = || {
        value
            .as_f64()
            .ok_or_else(|| format!("{} is not a number", value))
    };

    match type_name {
        "bool" => value
            .as_bool()
            .ok_or_else(|| format!("{} is not a bool", value))?
            .encode(out),
        "u8" => int::<u8>(value)?.encode(out),
        "i8" => int::<i8>(value)?.encode(out),
        "u16" => int::<u16>(value)?.encode(out),
        "i16" => int::<i16>(value)?.encode(out),
        "u32" => int::<u32>(value)?.encode(out),
        "i32" => int::<i32>(value)?.encode(out),
        "u64" => int::<u64>(value)?.encode(out),
        "i64" => int::<i64>(value)?.encode(out),
        "f32" => (float()? as f32).encode(out),
        "f64" => float()?.encode(out),
        other => return Err(format!("unknown element type '{}'", other)),
    }
    Ok(())
}
