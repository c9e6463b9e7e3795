//! Scheduling profile: one filter, score and pick pipeline.
//!
//! Evaluates candidate pods in three stages:
//! - **Filter**: each filter narrows the set; an empty set ends the run
//!   with no eligible pod (a normal outcome, not an error)
//! - **Score**: each scorer's clamped `[0, 1]` rating is multiplied by its
//!   weight and summed per pod
//! - **Pick**: the picker chooses one pod from the weighted totals

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use infergate_core::{LlmRequest, Pod, PodName};

use crate::cycle_state::CycleState;
use crate::error::{ConfigError, ConfigResult, PluginError};
use crate::framework::{Filter, Picker, Plugin, ScoredPod, Scorer};
use crate::plugins::MaxScorePicker;
use crate::result::ProfileRunResult;

/// A scorer with its weight in the profile's sum.
#[derive(Clone)]
pub struct WeightedScorer {
    pub scorer: Arc<dyn Scorer>,
    pub weight: f64,
}

/// A named pipeline of filters, weighted scorers and one picker.
///
/// Built once at startup and shared read-only across requests.
pub struct SchedulerProfile {
    name: String,
    filters: Vec<Arc<dyn Filter>>,
    scorers: Vec<WeightedScorer>,
    picker: Arc<dyn Picker>,
}

impl SchedulerProfile {
    /// Create an empty profile that picks the highest-scored pod.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: Vec::new(),
            scorers: Vec::new(),
            picker: Arc::new(MaxScorePicker::new(MaxScorePicker::TYPE)),
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a scorer. The weight must be finite and non-negative.
    pub fn with_scorer(mut self, scorer: Arc<dyn Scorer>, weight: f64) -> ConfigResult<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::InvalidWeight {
                plugin: scorer.typed_name().name.clone(),
                weight,
            });
        }
        self.scorers.push(WeightedScorer { scorer, weight });
        Ok(self)
    }

    pub fn with_picker(mut self, picker: Arc<dyn Picker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filters(&self) -> &[Arc<dyn Filter>] {
        &self.filters
    }

    pub fn scorers(&self) -> &[WeightedScorer] {
        &self.scorers
    }

    pub fn picker(&self) -> &Arc<dyn Picker> {
        &self.picker
    }

    /// Run the pipeline once over `candidate_pods`.
    ///
    /// Candidates sharing a [`PodName`] are collapsed after filtering; the
    /// first one in input order is scored and may be returned.
    pub async fn run(
        &self,
        request: &LlmRequest,
        cycle_state: &CycleState,
        candidate_pods: &[Pod],
    ) -> Result<ProfileRunResult, PluginError> {
        let mut pods: Vec<&Pod> = candidate_pods.iter().collect();

        for filter in &self.filters {
            if pods.is_empty() {
                break;
            }
            pods = filter.filter(cycle_state, request, pods).await?;
            trace!(
                profile = %self.name,
                filter = %filter.typed_name(),
                remaining = pods.len(),
                "filter applied"
            );
        }

        if pods.is_empty() {
            debug!(profile = %self.name, "no eligible pods after filtering");
            return Ok(ProfileRunResult::empty());
        }

        let filtered = pods.len();
        pods.sort_by(|a, b| a.name.cmp(&b.name));
        pods.dedup_by(|a, b| a.name == b.name);
        if pods.len() < filtered {
            debug!(
                profile = %self.name,
                dropped = filtered - pods.len(),
                "duplicate pod names collapsed to first occurrence"
            );
        }

        let mut totals: BTreeMap<PodName, f64> =
            pods.iter().map(|p| (p.name.clone(), 0.0)).collect();

        for weighted in &self.scorers {
            let raw = weighted.scorer.score(cycle_state, request, &pods).await?;
            for (pod, total) in totals.iter_mut() {
                let score = raw.get(pod).copied().unwrap_or(0.0);
                let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
                *total += weighted.weight * score;
            }
        }

        let scored: Vec<ScoredPod<'_>> = pods
            .iter()
            .map(|&pod| ScoredPod {
                pod,
                score: totals.get(&pod.name).copied().unwrap_or(0.0),
            })
            .collect();

        let target = self.picker.pick(cycle_state, request, &scored)?;
        debug!(
            profile = %self.name,
            target = ?target.map(|p| p.name.to_string()),
            scored = scored.len(),
            "profile run complete"
        );

        Ok(ProfileRunResult {
            target_pod: target.cloned(),
            scores: totals,
        })
    }
}

impl std::fmt::Debug for SchedulerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerProfile")
            .field("name", &self.name)
            .field(
                "filters",
                &self.filters.iter().map(|p| p.typed_name().to_string()).collect::<Vec<_>>(),
            )
            .field(
                "scorers",
                &self
                    .scorers
                    .iter()
                    .map(|s| (s.scorer.typed_name().to_string(), s.weight))
                    .collect::<Vec<_>>(),
            )
            .field("picker", &self.picker.typed_name().to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use infergate_core::{MetricsSnapshot, TypedName};

    use crate::plugins::{MetricScorer, MetricThresholdFilter};

    fn make_pod(name: &str, queue: f64, kv: f64) -> Pod {
        Pod::new("default", name).with_metrics(
            MetricsSnapshot::default()
                .with_value("queue", queue)
                .with_value("kv", kv),
        )
    }

    fn request() -> LlmRequest {
        LlmRequest::new("r1", "llama").unwrap()
    }

    struct FixedScorer {
        typed_name: TypedName,
        scores: Vec<(&'static str, f64)>,
    }

    impl Plugin for FixedScorer {
        fn typed_name(&self) -> &TypedName {
            &self.typed_name
        }
    }

    #[async_trait]
    impl Scorer for FixedScorer {
        async fn score(
            &self,
            _cycle_state: &CycleState,
            _request: &LlmRequest,
            _pods: &[&Pod],
        ) -> Result<BTreeMap<PodName, f64>, PluginError> {
            Ok(self
                .scores
                .iter()
                .map(|(name, s)| (PodName::new("default", *name), *s))
                .collect())
        }
    }

    fn fixed(scores: Vec<(&'static str, f64)>) -> Arc<dyn Scorer> {
        Arc::new(FixedScorer {
            typed_name: TypedName::new("fixed", "fixed"),
            scores,
        })
    }

    struct FailingScorer(TypedName);

    impl Plugin for FailingScorer {
        fn typed_name(&self) -> &TypedName {
            &self.0
        }
    }

    #[async_trait]
    impl Scorer for FailingScorer {
        async fn score(
            &self,
            _cycle_state: &CycleState,
            _request: &LlmRequest,
            _pods: &[&Pod],
        ) -> Result<BTreeMap<PodName, f64>, PluginError> {
            Err(PluginError::failed("boom", "scorer exploded"))
        }
    }

    #[tokio::test]
    async fn filter_eliminating_all_pods_yields_empty_result() {
        let profile = SchedulerProfile::new("p1")
            .with_filter(Arc::new(MetricThresholdFilter::new("queue-ok", "queue", 1.0)));
        let pods = vec![make_pod("a", 5.0, 0.1), make_pod("b", 7.0, 0.1)];

        let result = profile.run(&request(), &CycleState::new(), &pods).await.unwrap();
        assert_eq!(result, ProfileRunResult::empty());
    }

    #[tokio::test]
    async fn empty_candidate_set_yields_empty_result() {
        let profile = SchedulerProfile::new("p1");
        let result = profile.run(&request(), &CycleState::new(), &[]).await.unwrap();
        assert!(result.target_pod.is_none());
        assert!(result.scores.is_empty());
    }

    #[tokio::test]
    async fn filter_then_score_then_pick() {
        let profile = SchedulerProfile::new("p1")
            .with_filter(Arc::new(MetricThresholdFilter::new("queue-ok", "queue", 3.0)))
            .with_scorer(Arc::new(MetricScorer::new("kv", "kv", true)), 1.0)
            .unwrap();
        let pods = vec![
            make_pod("a", 1.0, 0.9),
            make_pod("b", 9.0, 0.0), // filtered out
            make_pod("c", 2.0, 0.1),
        ];

        let result = profile.run(&request(), &CycleState::new(), &pods).await.unwrap();
        assert_eq!(result.target_pod.as_ref().map(|p| p.name()), Some("c"));
        assert_eq!(result.scores.len(), 2);
        assert!(!result.scores.contains_key(&PodName::new("default", "b")));
    }

    #[tokio::test]
    async fn scores_are_weighted_and_clamped() {
        let profile = SchedulerProfile::new("p1")
            .with_scorer(fixed(vec![("a", 2.0), ("b", 0.5)]), 2.0)
            .unwrap()
            .with_scorer(fixed(vec![("b", 0.25)]), 4.0)
            .unwrap();
        let pods = vec![make_pod("a", 0.0, 0.0), make_pod("b", 0.0, 0.0)];

        let result = profile.run(&request(), &CycleState::new(), &pods).await.unwrap();
        // a: 2 * clamp(2.0) = 2.0; b: 2 * 0.5 + 4 * 0.25 = 2.0
        assert_eq!(result.scores[&PodName::new("default", "a")], 2.0);
        assert_eq!(result.scores[&PodName::new("default", "b")], 2.0);
        // Tie resolves to the lowest pod name.
        assert_eq!(result.target_pod.as_ref().map(|p| p.name()), Some("a"));
    }

    #[tokio::test]
    async fn tie_break_ignores_candidate_order() {
        let profile = SchedulerProfile::new("p1");
        let forward = vec![make_pod("a", 0.0, 0.0), make_pod("b", 0.0, 0.0)];
        let reversed = vec![make_pod("b", 0.0, 0.0), make_pod("a", 0.0, 0.0)];

        let r1 = profile.run(&request(), &CycleState::new(), &forward).await.unwrap();
        let r2 = profile.run(&request(), &CycleState::new(), &reversed).await.unwrap();
        assert_eq!(r1, r2);
    }

    #[tokio::test]
    async fn duplicate_pod_names_keep_first_occurrence() {
        let profile = SchedulerProfile::new("p1")
            .with_scorer(Arc::new(MetricScorer::new("kv", "kv", true)), 1.0)
            .unwrap();
        let pods = vec![
            make_pod("a", 0.0, 0.1),
            make_pod("b", 0.0, 0.5),
            make_pod("a", 0.0, 0.9),
        ];

        let result = profile.run(&request(), &CycleState::new(), &pods).await.unwrap();
        assert_eq!(result.scores.len(), 2);
        let target = result.target_pod.unwrap();
        assert_eq!(target.name(), "a");
        assert_eq!(target.metrics.get("kv"), Some(0.1));
    }

    #[tokio::test]
    async fn scorer_error_fails_the_run() {
        let profile = SchedulerProfile::new("p1")
            .with_scorer(Arc::new(FailingScorer(TypedName::new("failing", "boom"))), 1.0)
            .unwrap();
        let pods = vec![make_pod("a", 0.0, 0.0)];

        let err = profile.run(&request(), &CycleState::new(), &pods).await.unwrap_err();
        assert!(matches!(err, PluginError::Failed { .. }));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let result = SchedulerProfile::new("p1").with_scorer(fixed(vec![]), -1.0);
        assert!(matches!(result, Err(ConfigError::InvalidWeight { .. })));

        let result = SchedulerProfile::new("p1").with_scorer(fixed(vec![]), f64::NAN);
        assert!(matches!(result, Err(ConfigError::InvalidWeight { .. })));
    }
}
