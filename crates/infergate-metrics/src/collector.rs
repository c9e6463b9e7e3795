//! Scheduler metrics collector: end-to-end and per-plugin latency.
//!
//! Counters are atomics; latency samples sit behind a mutex per series so
//! that concurrent schedule calls only contend on the series they touch.
//! Each series keeps only its most recent samples, so percentiles describe a
//! sliding window while counts cover the collector's whole lifetime.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Extension point label for the handler's profile selection step.
pub const PROFILE_PICKER_EXTENSION_POINT: &str = "ProfilePicker";
/// Extension point label for the handler's result aggregation step.
pub const PROCESS_RESULTS_EXTENSION_POINT: &str = "ProcessProfilesResults";
/// Extension point label for a whole profile run.
pub const PROFILE_RUN_EXTENSION_POINT: &str = "ProfileRun";

/// Samples retained per latency series.
pub const DEFAULT_SAMPLE_WINDOW: usize = 4096;

/// Label set identifying one plugin latency series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PluginLabel {
    pub extension_point: String,
    pub plugin_type: String,
    pub plugin_name: String,
}

/// One latency series: total sample count plus the most recent raw samples
/// in microseconds.
struct LatencySeries {
    count: AtomicU64,
    samples: Mutex<VecDeque<u64>>,
    window: usize,
}

impl LatencySeries {
    fn new(window: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            samples: Mutex::new(VecDeque::with_capacity(window.min(DEFAULT_SAMPLE_WINDOW))),
            window,
        }
    }

    async fn record(&self, latency: Duration) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let mut samples = self.samples.lock().await;
        if samples.len() >= self.window {
            samples.pop_front();
        }
        samples.push_back(micros);
    }

    async fn retained(&self) -> usize {
        self.samples.lock().await.len()
    }

    async fn summary(&self) -> LatencySummary {
        let samples = self.samples.lock().await;
        let (p50_ms, p99_ms) = compute_percentiles(samples.iter().copied());
        LatencySummary {
            count: self.count.load(Ordering::Relaxed),
            p50_ms,
            p99_ms,
        }
    }

    async fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.samples.lock().await.clear();
    }
}

/// Point-in-time view of one latency series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LatencySummary {
    pub count: u64,
    pub p50_ms: f64,
    pub p99_ms: f64,
}

/// Snapshot of every series the collector knows about.
#[derive(Debug, Clone, Default)]
pub struct MetricsReport {
    pub e2e: LatencySummary,
    pub scheduled: u64,
    pub failed: u64,
    /// Sorted by label.
    pub plugins: Vec<(PluginLabel, LatencySummary)>,
}

impl MetricsReport {
    pub fn plugin(&self, extension_point: &str, plugin_name: &str) -> Option<&LatencySummary> {
        self.plugins
            .iter()
            .find(|(l, _)| l.extension_point == extension_point && l.plugin_name == plugin_name)
            .map(|(_, s)| s)
    }
}

/// Collects scheduler latency measurements.
///
/// Shared behind an `Arc` by every scheduler built from one configuration.
pub struct SchedulerMetrics {
    e2e: LatencySeries,
    scheduled: AtomicU64,
    failed: AtomicU64,
    plugins: RwLock<HashMap<PluginLabel, Arc<LatencySeries>>>,
    window: usize,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::with_sample_window(DEFAULT_SAMPLE_WINDOW)
    }

    /// Keep at most `window` latency samples per series (minimum 1).
    pub fn with_sample_window(window: usize) -> Self {
        let window = window.max(1);
        Self {
            e2e: LatencySeries::new(window),
            scheduled: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            plugins: RwLock::new(HashMap::new()),
            window,
        }
    }

    pub fn sample_window(&self) -> usize {
        self.window
    }

    /// Record the wall-clock duration of one whole schedule call.
    pub async fn record_e2e_latency(&self, latency: Duration) {
        self.e2e.record(latency).await;
    }

    /// Count one schedule call outcome.
    pub fn record_outcome(&self, scheduled: bool) {
        if scheduled {
            self.scheduled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the duration of one plugin invocation.
    pub async fn record_plugin_latency(
        &self,
        extension_point: &str,
        plugin_type: &str,
        plugin_name: &str,
        latency: Duration,
    ) {
        let label = PluginLabel {
            extension_point: extension_point.to_string(),
            plugin_type: plugin_type.to_string(),
            plugin_name: plugin_name.to_string(),
        };

        let existing = self.plugins.read().await.get(&label).cloned();
        let series = match existing {
            Some(series) => series,
            None => {
                let mut plugins = self.plugins.write().await;
                plugins
                    .entry(label.clone())
                    .or_insert_with(|| {
                        debug!(
                            extension_point,
                            plugin_type, plugin_name, "registered plugin latency series"
                        );
                        Arc::new(LatencySeries::new(self.window))
                    })
                    .clone()
            }
        };
        series.record(latency).await;
    }

    pub async fn snapshot(&self) -> MetricsReport {
        let plugins = self.plugins.read().await;
        let mut entries = Vec::with_capacity(plugins.len());
        for (label, series) in plugins.iter() {
            entries.push((label.clone(), series.summary().await));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        MetricsReport {
            e2e: self.e2e.summary().await,
            scheduled: self.scheduled.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            plugins: entries,
        }
    }

    /// Number of raw samples currently held across every series.
    pub async fn retained_samples(&self) -> usize {
        let mut total = self.e2e.retained().await;
        for series in self.plugins.read().await.values() {
            total += series.retained().await;
        }
        total
    }

    /// Clear every series, keeping the registered labels.
    pub async fn reset(&self) {
        self.e2e.reset().await;
        self.scheduled.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        let plugins = self.plugins.read().await;
        for series in plugins.values() {
            series.reset().await;
        }
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute P50 and P99 latency from unsorted microsecond samples.
///
/// Returns (p50_ms, p99_ms). If empty, returns (0.0, 0.0).
fn compute_percentiles(latencies: impl IntoIterator<Item = u64>) -> (f64, f64) {
    let mut sorted: Vec<u64> = latencies.into_iter().collect();
    if sorted.is_empty() {
        return (0.0, 0.0);
    }
    sorted.sort_unstable();

    let p50_idx = (sorted.len() as f64 * 0.50) as usize;
    let p99_idx = (sorted.len() as f64 * 0.99) as usize;

    let p50 = sorted[p50_idx.min(sorted.len() - 1)] as f64 / 1000.0;
    let p99 = sorted[p99_idx.min(sorted.len() - 1)] as f64 / 1000.0;

    (p50, p99)
}
