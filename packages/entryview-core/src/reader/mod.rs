//! Typed reader front-ends over column proxies.

mod array;
mod base;
mod bool_array;
mod fixed_array;
mod value;

pub use array::ArrayReader;
pub use base::{ReaderKind, SetupStatus};
pub use bool_array::BoolArrayReader;
pub use fixed_array::FixedArrayReader;
pub use value::ValueReader;
