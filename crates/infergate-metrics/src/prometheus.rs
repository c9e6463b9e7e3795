//! Prometheus text exposition format.
//!
//! Renders a scheduler metrics report as summaries and counters for
//! scraping by a Prometheus server or compatible agent.

use crate::collector::MetricsReport;

/// Render a metrics report into Prometheus text format.
pub fn render_prometheus(report: &MetricsReport) -> String {
    let mut out = String::new();

    out.push_str("# HELP infergate_scheduler_e2e_duration_ms End-to-end scheduling latency in milliseconds.\n");
    out.push_str("# TYPE infergate_scheduler_e2e_duration_ms summary\n");
    out.push_str(&format!(
        "infergate_scheduler_e2e_duration_ms{{quantile=\"0.5\"}} {:.3}\n",
        report.e2e.p50_ms
    ));
    out.push_str(&format!(
        "infergate_scheduler_e2e_duration_ms{{quantile=\"0.99\"}} {:.3}\n",
        report.e2e.p99_ms
    ));
    out.push_str(&format!(
        "infergate_scheduler_e2e_duration_ms_count {}\n",
        report.e2e.count
    ));

    out.push_str("# HELP infergate_scheduler_attempts_total Schedule calls by outcome.\n");
    out.push_str("# TYPE infergate_scheduler_attempts_total counter\n");
    out.push_str(&format!(
        "infergate_scheduler_attempts_total{{status=\"success\"}} {}\n",
        report.scheduled
    ));
    out.push_str(&format!(
        "infergate_scheduler_attempts_total{{status=\"failure\"}} {}\n",
        report.failed
    ));

    out.push_str("# HELP infergate_plugin_duration_ms Plugin processing latency in milliseconds.\n");
    out.push_str("# TYPE infergate_plugin_duration_ms summary\n");
    for (label, summary) in &report.plugins {
        let labels = format!(
            "extension_point=\"{}\",plugin_type=\"{}\",plugin_name=\"{}\"",
            escape(&label.extension_point),
            escape(&label.plugin_type),
            escape(&label.plugin_name)
        );
        out.push_str(&format!(
            "infergate_plugin_duration_ms{{{labels},quantile=\"0.5\"}} {:.3}\n",
            summary.p50_ms
        ));
        out.push_str(&format!(
            "infergate_plugin_duration_ms{{{labels},quantile=\"0.99\"}} {:.3}\n",
            summary.p99_ms
        ));
        out.push_str(&format!(
            "infergate_plugin_duration_ms_count{{{labels}}} {}\n",
            summary.count
        ));
    }

    out
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{LatencySummary, PluginLabel};

    fn test_report() -> MetricsReport {
        MetricsReport {
            e2e: LatencySummary {
                count: 3,
                p50_ms: 1.25,
                p99_ms: 4.5,
            },
            scheduled: 2,
            failed: 1,
            plugins: vec![(
                PluginLabel {
                    extension_point: "ProfilePicker".to_string(),
                    plugin_type: "single".to_string(),
                    plugin_name: "handler".to_string(),
                },
                LatencySummary {
                    count: 3,
                    p50_ms: 0.01,
                    p99_ms: 0.02,
                },
            )],
        }
    }

    #[test]
    fn render_contains_help_and_type() {
        let output = render_prometheus(&test_report());
        assert!(output.contains("# HELP infergate_scheduler_e2e_duration_ms"));
        assert!(output.contains("# TYPE infergate_scheduler_e2e_duration_ms summary"));
        assert!(output.contains("# TYPE infergate_scheduler_attempts_total counter"));
        assert!(output.contains("# TYPE infergate_plugin_duration_ms summary"));
    }

    #[test]
    fn render_contains_values() {
        let output = render_prometheus(&test_report());
        assert!(output.contains("infergate_scheduler_e2e_duration_ms{quantile=\"0.5\"} 1.250"));
        assert!(output.contains("infergate_scheduler_e2e_duration_ms_count 3"));
        assert!(output.contains("infergate_scheduler_attempts_total{status=\"failure\"} 1"));
        assert!(output.contains(
            "infergate_plugin_duration_ms_count{extension_point=\"ProfilePicker\",plugin_type=\"single\",plugin_name=\"handler\"} 3"
        ));
    }

    #[test]
    fn render_empty_report() {
        let output = render_prometheus(&MetricsReport::default());
        assert!(output.contains("infergate_scheduler_e2e_duration_ms_count 0"));
        assert!(!output.contains("plugin_name="));
    }

    #[test]
    fn label_values_are_escaped() {
        assert_eq!(escape("a\"b"), "a\\\"b");
        assert_eq!(escape("a\\b"), "a\\\\b");
    }
}
