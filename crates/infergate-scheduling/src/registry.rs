//! Plugin registry: maps configuration type names to constructors.
//!
//! The registry is an ordinary value: build it once at startup, register any
//! custom plugin types, and hand it by reference to
//! [`SchedulerConfig::from_file_config`](crate::config::SchedulerConfig::from_file_config).

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use infergate_core::config::{HandlerConfig, PluginSpec};

use crate::error::{ConfigError, ConfigResult};
use crate::framework::{Filter, Picker, ProfileHandler, Scorer};
use crate::handlers::{FallbackProfileHandler, HighestScoreHandler, SingleProfileHandler};
use crate::plugins::{AdapterLoadedFilter, MaxScorePicker, MetricScorer, MetricThresholdFilter};

/// A constructed stage plugin.
#[derive(Clone)]
pub enum PluginInstance {
    Filter(Arc<dyn Filter>),
    Scorer(Arc<dyn Scorer>),
    Picker(Arc<dyn Picker>),
}

impl PluginInstance {
    pub fn kind(&self) -> &'static str {
        match self {
            PluginInstance::Filter(_) => "filter",
            PluginInstance::Scorer(_) => "scorer",
            PluginInstance::Picker(_) => "picker",
        }
    }
}

/// Builds a stage plugin from its instance name and parameter table.
pub type PluginFactory =
    Arc<dyn Fn(&str, &toml::Table) -> ConfigResult<PluginInstance> + Send + Sync>;

/// Builds a profile handler from its config section and the configured
/// profile names (sorted).
pub type HandlerFactory =
    Arc<dyn Fn(&HandlerConfig, &[String]) -> ConfigResult<Arc<dyn ProfileHandler>> + Send + Sync>;

#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginFactory>,
    handlers: HashMap<String, HandlerFactory>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in plugin and handler type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_plugin(
            MetricThresholdFilter::TYPE,
            Arc::new(|name: &str, params: &toml::Table| -> ConfigResult<PluginInstance> {
                let params = decode_params(name, params)?;
                Ok(PluginInstance::Filter(Arc::new(
                    MetricThresholdFilter::from_params(name, params),
                )))
            }),
        );
        registry.register_plugin(
            AdapterLoadedFilter::TYPE,
            Arc::new(|name: &str, _params: &toml::Table| -> ConfigResult<PluginInstance> {
                Ok(PluginInstance::Filter(Arc::new(AdapterLoadedFilter::new(name))))
            }),
        );
        registry.register_plugin(
            MetricScorer::TYPE,
            Arc::new(|name: &str, params: &toml::Table| -> ConfigResult<PluginInstance> {
                let params = decode_params(name, params)?;
                Ok(PluginInstance::Scorer(Arc::new(MetricScorer::from_params(
                    name, params,
                ))))
            }),
        );
        registry.register_plugin(
            MaxScorePicker::TYPE,
            Arc::new(|name: &str, _params: &toml::Table| -> ConfigResult<PluginInstance> {
                Ok(PluginInstance::Picker(Arc::new(MaxScorePicker::new(name))))
            }),
        );

        registry.register_handler(
            SingleProfileHandler::TYPE,
            Arc::new(|_config: &HandlerConfig, profiles: &[String]| -> ConfigResult<Arc<dyn ProfileHandler>> {
                if profiles.len() != 1 {
                    return Err(ConfigError::HandlerProfileMismatch {
                        handler: SingleProfileHandler::TYPE.to_string(),
                        reason: format!("expected exactly one profile, found {}", profiles.len()),
                    });
                }
                Ok(Arc::new(SingleProfileHandler::new(SingleProfileHandler::TYPE)))
            }),
        );
        registry.register_handler(
            FallbackProfileHandler::TYPE,
            Arc::new(|config: &HandlerConfig, profiles: &[String]| -> ConfigResult<Arc<dyn ProfileHandler>> {
                let order = if config.order.is_empty() {
                    profiles.to_vec()
                } else {
                    config.order.clone()
                };
                if order.is_empty() {
                    return Err(ConfigError::HandlerProfileMismatch {
                        handler: FallbackProfileHandler::TYPE.to_string(),
                        reason: "no profiles to fall back between".to_string(),
                    });
                }
                if let Some(unknown) = order.iter().find(|name| !profiles.contains(*name)) {
                    return Err(ConfigError::HandlerProfileMismatch {
                        handler: FallbackProfileHandler::TYPE.to_string(),
                        reason: format!("order names unknown profile '{unknown}'"),
                    });
                }
                Ok(Arc::new(FallbackProfileHandler::new(FallbackProfileHandler::TYPE, order)))
            }),
        );
        registry.register_handler(
            HighestScoreHandler::TYPE,
            Arc::new(|_config: &HandlerConfig, _profiles: &[String]| -> ConfigResult<Arc<dyn ProfileHandler>> {
                Ok(Arc::new(HighestScoreHandler::new(HighestScoreHandler::TYPE)))
            }),
        );

        registry
    }

    /// Register a stage plugin type, replacing any previous factory.
    pub fn register_plugin(&mut self, plugin_type: impl Into<String>, factory: PluginFactory) {
        self.plugins.insert(plugin_type.into(), factory);
    }

    /// Register a handler type, replacing any previous factory.
    pub fn register_handler(&mut self, handler_type: impl Into<String>, factory: HandlerFactory) {
        self.handlers.insert(handler_type.into(), factory);
    }

    pub fn instantiate_plugin(&self, spec: &PluginSpec) -> ConfigResult<PluginInstance> {
        let factory = self
            .plugins
            .get(&spec.plugin_type)
            .ok_or_else(|| ConfigError::UnknownPluginType(spec.plugin_type.clone()))?;
        factory(&spec.name, &spec.parameters)
    }

    pub fn instantiate_handler(
        &self,
        config: &HandlerConfig,
        profiles: &[String],
    ) -> ConfigResult<Arc<dyn ProfileHandler>> {
        let factory = self
            .handlers
            .get(&config.handler_type)
            .ok_or_else(|| ConfigError::UnknownHandlerType(config.handler_type.clone()))?;
        factory(config, profiles)
    }

    /// Registered stage plugin types, sorted.
    pub fn plugin_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Registered handler types, sorted.
    pub fn handler_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

/// Decode a plugin's parameter table into its typed parameter struct.
pub fn decode_params<P: DeserializeOwned>(plugin: &str, params: &toml::Table) -> ConfigResult<P> {
    toml::Value::Table(params.clone())
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::InvalidParameters {
            plugin: plugin.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, plugin_type: &str, params: &str) -> PluginSpec {
        PluginSpec {
            name: name.to_string(),
            plugin_type: plugin_type.to_string(),
            parameters: toml::from_str(params).unwrap(),
        }
    }

    fn handler(handler_type: &str, order: &[&str]) -> HandlerConfig {
        HandlerConfig {
            handler_type: handler_type.to_string(),
            order: order.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn builtins_are_registered() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(
            registry.plugin_types(),
            vec!["adapter-loaded-filter", "max-score", "metric-scorer", "metric-threshold-filter"]
        );
        assert_eq!(registry.handler_types(), vec!["fallback", "highest-score", "single"]);
    }

    #[test]
    fn instantiates_each_kind() {
        let registry = PluginRegistry::with_builtins();

        let filter = registry
            .instantiate_plugin(&spec("q", "metric-threshold-filter", "metric = \"q\"\nmax = 1.0"))
            .unwrap();
        assert_eq!(filter.kind(), "filter");

        let scorer = registry
            .instantiate_plugin(&spec("kv", "metric-scorer", "metric = \"kv\""))
            .unwrap();
        assert_eq!(scorer.kind(), "scorer");

        let picker = registry.instantiate_plugin(&spec("p", "max-score", "")).unwrap();
        assert_eq!(picker.kind(), "picker");
    }

    #[test]
    fn unknown_plugin_type_is_rejected() {
        let registry = PluginRegistry::with_builtins();
        let err = registry
            .instantiate_plugin(&spec("x", "prefix-cache-scorer", ""))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownPluginType(t) if t == "prefix-cache-scorer"));
    }

    #[test]
    fn missing_parameters_are_rejected() {
        let registry = PluginRegistry::with_builtins();
        let err = registry
            .instantiate_plugin(&spec("q", "metric-threshold-filter", "metric = \"q\""))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidParameters { .. }));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = PluginRegistry::new();
        assert!(registry.plugin_types().is_empty());
        assert!(matches!(
            registry.instantiate_handler(&handler("single", &[]), &["p".to_string()]),
            Err(ConfigError::UnknownHandlerType(_))
        ));
    }

    #[test]
    fn single_handler_requires_one_profile() {
        let registry = PluginRegistry::with_builtins();
        let profiles = vec!["a".to_string(), "b".to_string()];
        assert!(matches!(
            registry.instantiate_handler(&handler("single", &[]), &profiles),
            Err(ConfigError::HandlerProfileMismatch { .. })
        ));
        assert!(registry
            .instantiate_handler(&handler("single", &[]), &profiles[..1])
            .is_ok());
    }

    #[test]
    fn fallback_order_must_name_known_profiles() {
        let registry = PluginRegistry::with_builtins();
        let profiles = vec!["a".to_string(), "b".to_string()];
        assert!(registry
            .instantiate_handler(&handler("fallback", &["b", "a"]), &profiles)
            .is_ok());
        assert!(matches!(
            registry.instantiate_handler(&handler("fallback", &["a", "c"]), &profiles),
            Err(ConfigError::HandlerProfileMismatch { .. })
        ));
    }

    #[test]
    fn custom_plugin_type_can_be_registered() {
        let mut registry = PluginRegistry::new();
        registry.register_plugin(
            "always-max",
            Arc::new(|name: &str, _params: &toml::Table| -> ConfigResult<PluginInstance> {
                Ok(PluginInstance::Picker(Arc::new(MaxScorePicker::new(name))))
            }),
        );
        let instance = registry.instantiate_plugin(&spec("m", "always-max", "")).unwrap();
        assert_eq!(instance.kind(), "picker");
    }
}
