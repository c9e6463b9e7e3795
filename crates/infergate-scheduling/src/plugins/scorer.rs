//! Metric scorer.
//!
//! Normalizes one metric across the surviving pods to `[0.0, 1.0]` using
//! min-max scaling. With `lower_is_better` (the default) the pod with the
//! smallest value scores 1.0; pods that don't report the metric are left
//! out and so score zero.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use infergate_core::{LlmRequest, Pod, PodName, TypedName};

use crate::cycle_state::CycleState;
use crate::error::PluginError;
use crate::framework::{Plugin, Scorer};

pub struct MetricScorer {
    typed_name: TypedName,
    params: MetricScorerParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricScorerParams {
    pub metric: String,
    #[serde(default = "default_lower_is_better")]
    pub lower_is_better: bool,
}

fn default_lower_is_better() -> bool {
    true
}

impl MetricScorer {
    pub const TYPE: &'static str = "metric-scorer";

    pub fn new(name: impl Into<String>, metric: impl Into<String>, lower_is_better: bool) -> Self {
        Self::from_params(
            name,
            MetricScorerParams {
                metric: metric.into(),
                lower_is_better,
            },
        )
    }

    pub fn from_params(name: impl Into<String>, params: MetricScorerParams) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
            params,
        }
    }
}

impl Plugin for MetricScorer {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl Scorer for MetricScorer {
    async fn score(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        pods: &[&Pod],
    ) -> Result<BTreeMap<PodName, f64>, PluginError> {
        let values: Vec<(&PodName, f64)> = pods
            .iter()
            .filter_map(|p| {
                p.metrics
                    .get(&self.params.metric)
                    .filter(|v| v.is_finite())
                    .map(|v| (&p.name, v))
            })
            .collect();

        if values.is_empty() {
            return Ok(BTreeMap::new());
        }

        let min = values.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let max = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
        // Halved so that `max - min` stays finite for extreme inputs.
        let half_range = max / 2.0 - min / 2.0;
        let spread = half_range > f64::EPSILON / 2.0;

        Ok(values
            .into_iter()
            .map(|(name, v)| {
                // Identical values: every reporting pod is equally good.
                let normalized = if spread {
                    ((v / 2.0 - min / 2.0) / half_range).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let score = if self.params.lower_is_better {
                    1.0 - normalized
                } else if spread {
                    normalized
                } else {
                    1.0
                };
                (name.clone(), score)
            })
            .collect())
    }
}
