//! Per-entity sensor data cache: entries, merge engine, single-flight store.

mod entry;
mod merge;
mod store;

pub use entry::SensorData;
pub use merge::{merge_component_set, merge_hit};
pub use store::SensorCache;

pub(crate) use store::{BeginFetch, MissDisposition};
