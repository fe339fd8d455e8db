//! A small metrics seam so the tool executor and step loop can record
//! duration/counter observations without pulling in a vendored metrics
//! backend. Mirrors how persistence is injected as a trait rather than a
//! concrete store.

use std::collections::HashMap;
use std::sync::Mutex;

pub type Tags = Vec<(&'static str, String)>;

pub trait Metrics: Send + Sync {
    fn record_duration(&self, name: &str, tags: &Tags, value_secs: f64);
    fn incr_counter(&self, name: &str, tags: &Tags);
}

/// Emits every observation as a `tracing` event; the default for production,
/// since it requires no extra backend to see tool latency and error rates.
#[derive(Debug, Default)]
pub struct TracingMetrics;

impl Metrics for TracingMetrics {
    fn record_duration(&self, name: &str, tags: &Tags, value_secs: f64) {
        tracing::info!(metric = name, ?tags, value_secs, "duration");
    }

    fn incr_counter(&self, name: &str, tags: &Tags) {
        tracing::info!(metric = name, ?tags, "counter");
    }
}

/// Records observations in-memory for assertions in tests.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    durations: Mutex<Vec<(String, Tags, f64)>>,
    counters: Mutex<HashMap<String, u64>>,
}

impl Metrics for InMemoryMetrics {
    fn record_duration(&self, name: &str, tags: &Tags, value_secs: f64) {
        self.durations.lock().unwrap().push((name.to_string(), tags.clone(), value_secs));
    }

    fn incr_counter(&self, name: &str, tags: &Tags) {
        let key = format!("{name}{tags:?}");
        *self.counters.lock().unwrap().entry(key).or_insert(0) += 1;
    }
}

impl InMemoryMetrics {
    pub fn counter_count(&self, name: &str, tags: &Tags) -> u64 {
        let key = format!("{name}{tags:?}");
        *self.counters.lock().unwrap().get(&key).unwrap_or(&0)
    }

    pub fn duration_count(&self) -> usize {
        self.durations.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_metrics_counts_by_name_and_tags() {
        let m = InMemoryMetrics::default();
        let tags = vec![("tool.name", "read".to_string())];
        m.incr_counter("tool.calls", &tags);
        m.incr_counter("tool.calls", &tags);
        assert_eq!(m.counter_count("tool.calls", &tags), 2);
    }
}
