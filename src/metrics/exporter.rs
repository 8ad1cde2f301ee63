use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::ObjectCacheMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for object cache metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// by Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_counter(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} counter", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} gauge", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<ObjectCacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &ObjectCacheMetricsSnapshot) {
        self.write_counter(&self.metric_name("pin_calls_total"), snapshot.pin_calls);
        self.write_counter(&self.metric_name("pin_hits_total"), snapshot.pin_hits);
        self.write_counter(&self.metric_name("pin_misses_total"), snapshot.pin_misses);
        self.write_counter(
            &self.metric_name("constructions_total"),
            snapshot.constructions,
        );
        self.write_counter(
            &self.metric_name("construction_failures_total"),
            snapshot.construction_failures,
        );
        self.write_counter(
            &self.metric_name("stale_evictions_total"),
            snapshot.stale_evictions,
        );
        self.write_counter(
            &self.metric_name("capacity_evictions_total"),
            snapshot.capacity_evictions,
        );
        self.write_counter(&self.metric_name("unpins_total"), snapshot.unpins);
        self.write_counter(&self.metric_name("discards_total"), snapshot.discards);
        self.write_counter(&self.metric_name("detaches_total"), snapshot.detaches);
        self.write_gauge(&self.metric_name("bytes_cached"), snapshot.bytes_cached);
        self.write_gauge(&self.metric_name("bytes_max"), snapshot.bytes_max);
        self.write_gauge(&self.metric_name("entries"), snapshot.entries as u64);
        self.write_gauge(
            &self.metric_name("pinned_entries"),
            snapshot.pinned_entries as u64,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_writes_prefixed_counters_and_gauges() {
        let exporter = PrometheusTextExporter::new("plans", Vec::new());
        let snapshot = ObjectCacheMetricsSnapshot {
            pin_calls: 7,
            pin_hits: 5,
            bytes_cached: 12,
            bytes_max: 100,
            entries: 3,
            ..Default::default()
        };
        exporter.export(&snapshot);

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE plans_pin_calls_total counter\nplans_pin_calls_total 7\n"));
        assert!(text.contains("plans_pin_hits_total 5\n"));
        assert!(text.contains("# TYPE plans_bytes_cached gauge\nplans_bytes_cached 12\n"));
        assert!(text.contains("plans_entries 3\n"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&ObjectCacheMetricsSnapshot::default());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.starts_with("# TYPE pin_calls_total counter\n"));
    }
}
