#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ObjectCacheMetricsSnapshot {
    pub pin_calls: u64,
    pub pin_hits: u64,
    pub pin_misses: u64,

    pub constructions: u64,
    pub construction_failures: u64,

    pub stale_evictions: u64,
    pub capacity_evictions: u64,
    pub unpins: u64,
    pub discards: u64,
    pub detaches: u64,

    // gauges captured at snapshot time
    pub bytes_cached: u64,
    pub bytes_max: u64,
    pub entries: usize,
    pub pinned_entries: usize,
}

impl ObjectCacheMetricsSnapshot {
    /// Fraction of pin calls served by an existing entry.
    pub fn hit_ratio(&self) -> f64 {
        if self.pin_calls == 0 {
            0.0
        } else {
            self.pin_hits as f64 / self.pin_calls as f64
        }
    }
}
