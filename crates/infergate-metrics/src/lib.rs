//! infergate-metrics: latency measurements for the request scheduler.
//!
//! Tracks end-to-end schedule latency, schedule outcomes and per-plugin
//! processing latency, and renders them in Prometheus text format.
//!
//! # Architecture
//!
//! ```text
//! SchedulerMetrics
//!   ├── record_e2e_latency()    ← once per schedule call
//!   ├── record_plugin_latency() ← per handler / profile invocation
//!   └── snapshot() → MetricsReport
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain
//! ```

pub mod collector;
pub mod prometheus;

pub use collector::{
    DEFAULT_SAMPLE_WINDOW, LatencySummary, MetricsReport, PluginLabel, SchedulerMetrics,
    PROCESS_RESULTS_EXTENSION_POINT,
    PROFILE_PICKER_EXTENSION_POINT, PROFILE_RUN_EXTENSION_POINT,
};
pub use prometheus::render_prometheus;
