use crate::metrics::traits::ObjectCacheMetricsRecorder;

#[derive(Debug, Default)]
pub struct ObjectCacheMetrics {
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
}

impl ObjectCacheMetricsRecorder for ObjectCacheMetrics {
    fn record_pin_hit(&mut self) {
        self.pin_calls += 1;
        self.pin_hits += 1;
    }

    fn record_pin_miss(&mut self) {
        self.pin_calls += 1;
        self.pin_misses += 1;
    }

    fn record_construction(&mut self) {
        self.constructions += 1;
    }

    fn record_construction_failure(&mut self) {
        self.construction_failures += 1;
    }

    fn record_stale_eviction(&mut self) {
        self.stale_evictions += 1;
    }

    fn record_capacity_eviction(&mut self) {
        self.capacity_evictions += 1;
    }

    fn record_unpin(&mut self) {
        self.unpins += 1;
    }

    fn record_discard(&mut self) {
        self.discards += 1;
    }

    fn record_detach(&mut self) {
        self.detaches += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_and_misses_both_count_as_pin_calls() {
        let mut metrics = ObjectCacheMetrics::default();
        metrics.record_pin_hit();
        metrics.record_pin_miss();
        metrics.record_pin_miss();
        assert_eq!(metrics.pin_calls, 3);
        assert_eq!(metrics.pin_hits, 1);
        assert_eq!(metrics.pin_misses, 2);
    }
}
