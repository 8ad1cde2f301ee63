//! # Metrics Traits
//!
//! ```text
//!   ┌───────────────────────────────┐
//!   │  ObjectCacheMetricsRecorder   │  written by the registry under its lock
//!   └───────────────┬───────────────┘
//!                   │
//!   Consumption (decoupled from recording):
//!   ┌───────────────┴──────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```

/// Counters for the pin/unpin protocol.
pub trait ObjectCacheMetricsRecorder {
    fn record_pin_hit(&mut self);
    fn record_pin_miss(&mut self);
    fn record_construction(&mut self);
    fn record_construction_failure(&mut self);
    fn record_stale_eviction(&mut self);
    fn record_capacity_eviction(&mut self);
    fn record_unpin(&mut self);
    fn record_discard(&mut self);
    fn record_detach(&mut self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
