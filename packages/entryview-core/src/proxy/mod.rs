//! Column proxies: lazy resolution of column paths to byte locations.

mod absence;
mod collection;
pub mod descriptor;
#[allow(clippy::module_inception)]
mod proxy;

pub use absence::{AbsencePolicy, NeverBenign, SplitPrefixPolicy};
pub use collection::CollectionView;
pub use descriptor::{AccessStep, ColumnDescriptor, Location, ValueShape};
pub use proxy::{ColumnProxy, ProxyId, ProxyRef, ProxyState};
