//! Pin/eviction counters for the object cache (feature `metrics`).
//!
//! Recording, snapshotting and export are split into separate traits so the
//! registry only ever increments plain counters under its own lock.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
