use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use infergate_core::{LlmRequest, Pod};
use infergate_metrics::render_prometheus;
use infergate_scheduling::{Scheduler, SchedulingResult};

use super::load_config;

/// One offline scheduling job.
#[derive(Debug, Deserialize)]
pub struct ScheduleInput {
    pub request: LlmRequest,
    #[serde(default)]
    pub pods: Vec<Pod>,
}

impl ScheduleInput {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let input: ScheduleInput = serde_json::from_str(content)?;
        input.request.validate()?;
        Ok(input)
    }
}

pub async fn schedule(
    config: &str,
    input: &str,
    format: &str,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let scheduler = Scheduler::new(load_config(config)?);
    let input = ScheduleInput::from_file(Path::new(input))?;
    info!(
        request_id = %input.request.request_id,
        pods = input.pods.len(),
        "scheduling request"
    );

    let outcome = match timeout_ms {
        Some(ms) => {
            scheduler
                .schedule_with_timeout(&input.request, &input.pods, Duration::from_millis(ms))
                .await
        }
        None => {
            let cancel = CancellationToken::new();
            let on_interrupt = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("interrupt received, cancelling");
                        cancel.cancel();
                    }
                })
            };
            let outcome = scheduler.schedule(&cancel, &input.request, &input.pods).await;
            on_interrupt.abort();
            outcome
        }
    };

    let report = scheduler.metrics().snapshot().await;
    debug!("metrics exposition:\n{}", render_prometheus(&report));

    let result = outcome?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print!("{}", format_decision(&input.request, &result));
        }
    }

    Ok(())
}

/// Human-readable summary of a decision and every profile behind it.
pub fn format_decision(request: &LlmRequest, result: &SchedulingResult) -> String {
    let target = result
        .target_pod
        .as_ref()
        .map(|pod| pod.name.to_string())
        .unwrap_or_else(|| "-".to_string());
    let primary = result.primary_profile.as_deref().unwrap_or("-");

    let mut out = format!(
        "✓ Request {} → {} (profile: {})\n",
        request.request_id, target, primary
    );
    for (name, profile_result) in &result.profile_results {
        let line = match profile_result {
            None => "failed".to_string(),
            Some(r) => match (&r.target_pod, r.target_score()) {
                (Some(pod), Some(score)) => format!("{} score={score:.3}", pod.name),
                (Some(pod), None) => pod.name.to_string(),
                (None, _) => "no eligible pod".to_string(),
            },
        };
        out.push_str(&format!("  {name:<16} {line}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONFIG: &str = r#"
[handler]
type = "fallback"
order = ["strict", "relaxed"]

[[plugins]]
name = "short-queue"
type = "metric-threshold-filter"
parameters = { metric = "waiting_queue_size", max = 2.0 }

[[plugins]]
name = "kv"
type = "metric-scorer"
parameters = { metric = "kv_cache_usage" }

[[profiles]]
name = "strict"
filters = ["short-queue"]
[[profiles.scorers]]
plugin = "kv"

[[profiles]]
name = "relaxed"
[[profiles.scorers]]
plugin = "kv"
"#;

    const INPUT: &str = r#"{
        "request": { "request_id": "req-1", "target_model": "llama-3" },
        "pods": [
            { "name": "pod-a", "metrics": { "values": { "waiting_queue_size": 7, "kv_cache_usage": 0.2 } } },
            { "name": "pod-b", "metrics": { "values": { "waiting_queue_size": 9, "kv_cache_usage": 0.9 } } }
        ]
    }"#;

    #[test]
    fn test_parse_input_defaults_namespace() {
        let input = ScheduleInput::parse(INPUT).unwrap();
        assert_eq!(input.request.request_id, "req-1");
        assert_eq!(input.pods.len(), 2);
        assert_eq!(input.pods[0].namespace(), "default");
    }

    #[test]
    fn test_parse_input_rejects_blank_request_id() {
        let json = r#"{ "request": { "request_id": " ", "target_model": "m" } }"#;
        assert!(ScheduleInput::parse(json).is_err());
    }

    #[tokio::test]
    async fn test_decision_text_shows_every_profile() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scheduler.toml");
        fs::write(&config_path, CONFIG).unwrap();

        let scheduler = Scheduler::new(load_config(config_path.to_str().unwrap()).unwrap());
        let input = ScheduleInput::parse(INPUT).unwrap();
        let result = scheduler
            .schedule(&CancellationToken::new(), &input.request, &input.pods)
            .await
            .unwrap();

        let text = format_decision(&input.request, &result);
        assert!(text.starts_with("✓ Request req-1 → default/pod-a (profile: relaxed)"));
        assert!(text.contains("strict"));
        assert!(text.contains("no eligible pod"));
        assert!(text.contains("default/pod-a score=1.000"));
    }

    #[tokio::test]
    async fn test_schedule_command_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("scheduler.toml");
        let input_path = dir.path().join("input.json");
        fs::write(&config_path, CONFIG).unwrap();
        fs::write(&input_path, INPUT).unwrap();

        schedule(
            config_path.to_str().unwrap(),
            input_path.to_str().unwrap(),
            "json",
            Some(1_000),
        )
        .await
        .unwrap();
    }
}
