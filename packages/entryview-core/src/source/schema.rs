//! Column schema of a source.

use serde::{Deserialize, Serialize};

/// How a column stores its per-entry value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    /// Basic elements stored inline. `count_column` names the sibling column
    /// holding the per-entry element count of a variable-length array.
    Leaf {
        type_name: String,
        #[serde(default = "default_array_length")]
        array_length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count_column: Option<String>,
    },
    /// Whole object of `class_name` stored inline per entry
    Object { class_name: String },
    /// Element block of a fixed-class container wrapper
    IndexedContainer { element_class: String },
    /// Element block of a collection class
    Collection { class_name: String },
}

fn default_array_length() -> usize {
    1
}

/// One column of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(flatten)]
    pub kind: ColumnKind,
}

/// Ordered column list of a source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub columns: Vec<ColumnSchema>,
}

impl SourceSchema {
    /// Returns the column named `name`.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns `true` if the schema has a column named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// CRC32 of the serialized schema. Sources with the same columns share
    /// a fingerprint.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        for column in &self.columns {
            match serde_json::to_vec(column) {
                Ok(bytes) => hasher.update(&bytes),
                Err(_) => hasher.update(column.name.as_bytes()),
            }
        }
        hasher.finalize()
    }
}
