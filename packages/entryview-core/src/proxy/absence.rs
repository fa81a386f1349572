use crate::source::SourceSchema;

/// Decides whether a column missing from a source is expected.
///
/// A benign absence fails resolution silently and is not retried until the
/// schema generation changes.
pub trait AbsencePolicy {
    fn is_benign(&self, column: &str, schema: &SourceSchema) -> bool;
}

/// Treats a missing column as benign when the object it names was split
/// into sub-columns, i.e. some present column is named `column.<member>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitPrefixPolicy;

impl AbsencePolicy for SplitPrefixPolicy {
    fn is_benign(&self, column: &str, schema: &SourceSchema) -> bool {
        schema.column_names().any(|name| {
            name.len() > column.len() + 1
                && name.starts_with(column)
                && name.as_bytes()[column.len()] == b'.'
        })
    }
}

/// Reports every missing column.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverBenign;

impl AbsencePolicy for NeverBenign {
    fn is_benign(&self, _column: &str, _schema: &SourceSchema) -> bool {
        false
    }
}
