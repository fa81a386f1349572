//! Lazy typed column access over chains of schema-evolving entry sources.
//!
//! Provides the type catalog, entry sources and chains, column proxies that
//! resolve on first use and after every source transition, and typed
//! readers that view source storage in place when it is contiguous.

pub mod chain;
pub mod config;
pub mod diagnostics;
pub mod director;
pub mod entry_reader;
pub mod error;
pub mod proxy;
pub mod reader;
pub mod source;
pub mod types;

pub use chain::Chain;
pub use config::ReaderConfig;
pub use director::Director;
pub use entry_reader::{EntryReader, EntryStatus};
pub use error::ReaderError;
