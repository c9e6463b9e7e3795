//! Request and pod types shared across infergate crates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// An inference request as seen by the scheduler.
///
/// Built once by the admission layer and never mutated afterwards. The
/// `request_id` is only used to correlate logs and traces; uniqueness is
/// not enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub request_id: String,
    pub target_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl LlmRequest {
    pub fn new(request_id: impl Into<String>, target_model: impl Into<String>) -> CoreResult<Self> {
        let request_id = request_id.into();
        if request_id.trim().is_empty() {
            return Err(CoreError::EmptyRequestId);
        }
        Ok(Self {
            request_id,
            target_model: target_model.into(),
            adapter: None,
            metadata: BTreeMap::new(),
        })
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check invariants on a request that arrived through deserialization.
    pub fn validate(&self) -> CoreResult<()> {
        if self.request_id.trim().is_empty() {
            return Err(CoreError::EmptyRequestId);
        }
        Ok(())
    }
}

/// Namespace assumed when a pod name omits one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Identity of a serving pod.
///
/// Orders by namespace, then name. Every deterministic tie-break in the
/// scheduler relies on this ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PodName {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub name: String,
}

impl PodName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl fmt::Display for PodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl std::str::FromStr for PodName {
    type Err = CoreError;

    /// Parse `namespace/name`. A bare `name` lands in the `default` namespace.
    fn from_str(s: &str) -> CoreResult<Self> {
        let (namespace, name) = match s.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => (DEFAULT_NAMESPACE, s),
        };
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(CoreError::InvalidPodName(s.to_string()));
        }
        Ok(Self::new(namespace, name))
    }
}

/// Externally collected metrics attached to a pod.
///
/// The scheduler never interprets these itself; plugins look values up by
/// name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub values: BTreeMap<String, f64>,
    #[serde(default)]
    pub active_adapters: BTreeSet<String>,
}

impl MetricsSnapshot {
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }

    pub fn with_value(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.values.insert(metric.into(), value);
        self
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.active_adapters.insert(adapter.into());
        self
    }

    pub fn has_adapter(&self, adapter: &str) -> bool {
        self.active_adapters.contains(adapter)
    }
}

/// A candidate backend with its metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pod {
    #[serde(flatten)]
    pub name: PodName,
    #[serde(default)]
    pub metrics: MetricsSnapshot,
}

impl Pod {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: PodName::new(namespace, name),
            metrics: MetricsSnapshot::default(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsSnapshot) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn name(&self) -> &str {
        &self.name.name
    }

    pub fn namespace(&self) -> &str {
        &self.name.namespace
    }
}

/// A plugin's type and instance name, used in logs and metric labels.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypedName {
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub name: String,
}

impl TypedName {
    pub fn new(plugin_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TypedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.plugin_type, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_rejects_empty_id() {
        assert!(matches!(LlmRequest::new("", "llama"), Err(CoreError::EmptyRequestId)));
        assert!(matches!(LlmRequest::new("  ", "llama"), Err(CoreError::EmptyRequestId)));
    }

    #[test]
    fn request_builder_sets_optional_fields() {
        let req = LlmRequest::new("r1", "llama")
            .unwrap()
            .with_adapter("sql-lora")
            .with_metadata("tenant", "a");
        assert_eq!(req.adapter.as_deref(), Some("sql-lora"));
        assert_eq!(req.metadata.get("tenant").map(String::as_str), Some("a"));
    }

    #[test]
    fn pod_name_orders_by_namespace_then_name() {
        let mut names = vec![
            PodName::new("b", "a"),
            PodName::new("a", "z"),
            PodName::new("a", "b"),
        ];
        names.sort();
        assert_eq!(names[0], PodName::new("a", "b"));
        assert_eq!(names[1], PodName::new("a", "z"));
        assert_eq!(names[2], PodName::new("b", "a"));
    }

    #[test]
    fn pod_name_parses_with_and_without_namespace() {
        let full: PodName = "prod/vllm-0".parse().unwrap();
        assert_eq!(full, PodName::new("prod", "vllm-0"));

        let bare: PodName = "vllm-1".parse().unwrap();
        assert_eq!(bare.namespace, "default");

        assert!("prod/".parse::<PodName>().is_err());
        assert!("a/b/c".parse::<PodName>().is_err());
    }

    #[test]
    fn pod_deserializes_flattened_identity() {
        let json = r#"{
            "namespace": "default",
            "name": "pod-a",
            "metrics": { "values": { "kv_cache_usage": 0.4 }, "active_adapters": ["sql-lora"] }
        }"#;
        let pod: Pod = serde_json::from_str(json).unwrap();
        assert_eq!(pod.name(), "pod-a");
        assert_eq!(pod.metrics.get("kv_cache_usage"), Some(0.4));
        assert!(pod.metrics.has_adapter("sql-lora"));
    }

    #[test]
    fn pod_namespace_defaults_when_omitted() {
        let pod: Pod = serde_json::from_str(r#"{ "name": "pod-b" }"#).unwrap();
        assert_eq!(pod.namespace(), DEFAULT_NAMESPACE);
        assert!(pod.metrics.values.is_empty());
    }

    #[test]
    fn typed_name_displays_type_and_name() {
        let tn = TypedName::new("max-score", "picker");
        assert_eq!(tn.to_string(), "max-score/picker");
    }
}
