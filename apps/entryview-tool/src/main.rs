//! CLI tool for inspecting entry source descriptions.
//!
//! Provides commands for:
//! - Listing the column schema of every source in a chain
//! - Dumping per-entry values of a numeric column

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use entryview_core::source::{ChainDescription, ColumnKind, Source};
use entryview_core::types::{register_builtin_types, Element, TypeRegistry};
use entryview_core::{Chain, EntryReader, ReaderConfig};
use serde_json::Value;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Reader configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the column schema of each source
    Schema {
        /// Chain description file (JSON)
        file: PathBuf,
    },

    /// Print per-entry values of one column
    Dump {
        /// Chain description file (JSON)
        file: PathBuf,

        /// Column to read
        #[arg(short, long)]
        column: String,

        /// Maximum number of entries to print
        #[arg(short, long)]
        limit: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    let config = match &cli.config {
        Some(path) => ReaderConfig::from_json_file(path)?,
        None => ReaderConfig::default(),
    };

    match cli.command {
        Commands::Schema { file } => print_schema(&load_chain(&file)?),
        Commands::Dump {
            file,
            column,
            limit,
        } => dump(load_chain(&file)?, config, &column, limit),
    }
}

fn load_chain(path: &Path) -> anyhow::Result<Chain> {
    let chain = ChainDescription::from_json_file(path)?
        .build_chain()
        .with_context(|| format!("failed to build chain from {}", path.display()))?;
    tracing::info!(
        sources = chain.len(),
        entries = chain.total_entries(),
        "Loaded chain"
    );
    Ok(chain)
}

fn print_schema(chain: &Chain) -> anyhow::Result<()> {
    for element in chain.elements() {
        let source = &element.source;
        println!(
            "{} ({}, {} entries, first entry {})",
            element.title,
            source.generation(),
            source.entries(),
            element.first_entry
        );
        for column in &source.schema().columns {
            println!("  {:<24} {}", column.name, describe_kind(&column.kind));
        }
    }
    Ok(())
}

fn describe_kind(kind: &ColumnKind) -> String {
    match kind {
        ColumnKind::Leaf {
            type_name,
            count_column: Some(count_column),
            ..
        } => format!("{}[{}]", type_name, count_column),
        ColumnKind::Leaf {
            type_name,
            array_length,
            ..
        } if *array_length > 1 => format!("{}[{}]", type_name, array_length),
        ColumnKind::Leaf { type_name, .. } => type_name.clone(),
        ColumnKind::Object { class_name } => format!("object {}", class_name),
        ColumnKind::IndexedContainer { element_class } => format!("container of {}", element_class),
        ColumnKind::Collection { class_name } => format!("collection {}", class_name),
    }
}

fn dump(chain: Chain, config: ReaderConfig, column: &str, limit: Option<u64>) -> anyhow::Result<()> {
    let Some((type_name, is_array)) = leaf_type(&chain, column) else {
        bail!("no source has a numeric column named '{}'", column);
    };

    let registry = TypeRegistry::new();
    register_builtin_types(&registry)?;
    let mut entries = EntryReader::with_config(chain, Arc::new(registry), config);

    macro_rules! dump_as {
        ($ty:ty) => {
            if is_array {
                let mut reader = entries.array::<$ty>(column);
                dump_entries(&mut entries, limit, |entry| {
                    Ok(reader.get(entry)?.map(json_array))
                })
            } else {
                let mut reader = entries.value::<$ty>(column);
                dump_entries(&mut entries, limit, |entry| {
                    Ok(reader.get(entry)?.map(|value| Value::from(*value)))
                })
            }
        };
    }

    match type_name.as_str() {
        "bool" if is_array => {
            let mut reader = entries.bool_array(column);
            dump_entries(&mut entries, limit, |entry| {
                Ok(reader.get(entry)?.map(json_array))
            })
        }
        "bool" => dump_as!(bool),
        "u8" => dump_as!(u8),
        "i8" => dump_as!(i8),
        "u16" => dump_as!(u16),
        "i16" => dump_as!(i16),
        "u32" => dump_as!(u32),
        "i32" => dump_as!(i32),
        "u64" => dump_as!(u64),
        "i64" => dump_as!(i64),
        "f32" => dump_as!(f32),
        "f64" => dump_as!(f64),
        other => bail!("column '{}' has unsupported type '{}'", column, other),
    }
}

/// Returns the element type of `column` in the first source holding it,
/// and whether it yields more than one value per entry.
fn leaf_type(chain: &Chain, column: &str) -> Option<(String, bool)> {
    chain.elements().find_map(|element| {
        match &element.source.schema().column(column)?.kind {
            ColumnKind::Leaf {
                type_name,
                array_length,
                count_column,
            } => Some((
                type_name.clone(),
                *array_length > 1 || count_column.is_some(),
            )),
            _ => None,
        }
    })
}

fn dump_entries(
    entries: &mut EntryReader,
    limit: Option<u64>,
    mut read: impl FnMut(u64) -> anyhow::Result<Option<Value>>,
) -> anyhow::Result<()> {
    let mut printed = 0u64;
    while limit.map_or(true, |limit| printed < limit) && entries.next() {
        let Some(entry) = entries.current_entry() else {
            break;
        };
        match read(entry)? {
            Some(value) => println!("{}\t{}", entry, value),
            None => println!("{}\t-", entry),
        }
        printed += 1;
    }

    let diagnostics = entries.director().diagnostics();
    if diagnostics.total() > 0 {
        tracing::warn!(reported = diagnostics.total(), "Diagnostics reported while reading");
    }
    Ok(())
}

fn json_array<T: Element>(values: &[T]) -> Value
where
    Value: From<T>,
{
    Value::Array(values.iter().map(|v| Value::from(*v)).collect())
}
