//! Built-in filters over the pod metrics snapshot.

use async_trait::async_trait;
use serde::Deserialize;

use infergate_core::{LlmRequest, Pod, TypedName};

use crate::cycle_state::CycleState;
use crate::error::PluginError;
use crate::framework::{Filter, Plugin};

/// Keeps pods whose metric is at or below a threshold.
///
/// Pods that do not report the metric are dropped.
pub struct MetricThresholdFilter {
    typed_name: TypedName,
    params: MetricThresholdParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricThresholdParams {
    pub metric: String,
    pub max: f64,
}

impl MetricThresholdFilter {
    pub const TYPE: &'static str = "metric-threshold-filter";

    pub fn new(name: impl Into<String>, metric: impl Into<String>, max: f64) -> Self {
        Self::from_params(
            name,
            MetricThresholdParams {
                metric: metric.into(),
                max,
            },
        )
    }

    pub fn from_params(name: impl Into<String>, params: MetricThresholdParams) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
            params,
        }
    }
}

impl Plugin for MetricThresholdFilter {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl Filter for MetricThresholdFilter {
    async fn filter<'p>(
        &self,
        _cycle_state: &CycleState,
        _request: &LlmRequest,
        pods: Vec<&'p Pod>,
    ) -> Result<Vec<&'p Pod>, PluginError> {
        Ok(pods
            .into_iter()
            .filter(|pod| {
                pod.metrics
                    .get(&self.params.metric)
                    .is_some_and(|value| value <= self.params.max)
            })
            .collect())
    }
}

/// Keeps pods that already have the request's adapter loaded.
///
/// Requests without an adapter pass every pod through.
pub struct AdapterLoadedFilter {
    typed_name: TypedName,
}

impl AdapterLoadedFilter {
    pub const TYPE: &'static str = "adapter-loaded-filter";

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            typed_name: TypedName::new(Self::TYPE, name),
        }
    }
}

impl Plugin for AdapterLoadedFilter {
    fn typed_name(&self) -> &TypedName {
        &self.typed_name
    }
}

#[async_trait]
impl Filter for AdapterLoadedFilter {
    async fn filter<'p>(
        &self,
        _cycle_state: &CycleState,
        request: &LlmRequest,
        pods: Vec<&'p Pod>,
    ) -> Result<Vec<&'p Pod>, PluginError> {
        let Some(adapter) = request.adapter.as_deref() else {
            return Ok(pods);
        };
        Ok(pods
            .into_iter()
            .filter(|pod| pod.metrics.has_adapter(adapter))
            .collect())
    }
}
