//! Live scheduler configuration.
//!
//! [`SchedulerConfig`] holds the constructed handler and profiles. It is built
//! either programmatically with [`SchedulerConfig::new`] or from a parsed
//! [`SchedulingConfigFile`] through a [`PluginRegistry`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use infergate_core::SchedulingConfigFile;

use crate::error::{ConfigError, ConfigResult};
use crate::framework::{Plugin, ProfileHandler, ProfileMap};
use crate::profile::SchedulerProfile;
use crate::registry::{PluginInstance, PluginRegistry};

#[derive(Clone)]
pub struct SchedulerConfig {
    handler: Arc<dyn ProfileHandler>,
    profiles: ProfileMap,
}

impl SchedulerConfig {
    /// Pair a handler with its profiles. Profile names must be unique.
    pub fn new(
        handler: Arc<dyn ProfileHandler>,
        profiles: impl IntoIterator<Item = SchedulerProfile>,
    ) -> ConfigResult<Self> {
        let mut map = ProfileMap::new();
        for profile in profiles {
            let name = profile.name().to_string();
            if map.contains_key(&name) {
                return Err(ConfigError::DuplicateProfile(name));
            }
            map.insert(name, Arc::new(profile));
        }
        Ok(Self {
            handler,
            profiles: map,
        })
    }

    /// Instantiate every plugin named in `file`, assemble the profiles and
    /// build the handler.
    pub fn from_file_config(
        file: &SchedulingConfigFile,
        registry: &PluginRegistry,
    ) -> ConfigResult<Self> {
        let mut instances: HashMap<&str, PluginInstance> = HashMap::new();
        for spec in &file.plugins {
            if instances.contains_key(spec.name.as_str()) {
                return Err(ConfigError::DuplicatePlugin(spec.name.clone()));
            }
            let instance = registry.instantiate_plugin(spec)?;
            debug!(plugin = %spec.name, plugin_type = %spec.plugin_type, "plugin instantiated");
            instances.insert(spec.name.as_str(), instance);
        }

        let lookup = |profile: &str, plugin: &str| {
            instances
                .get(plugin)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownPlugin {
                    profile: profile.to_string(),
                    plugin: plugin.to_string(),
                })
        };

        let mut profiles = Vec::with_capacity(file.profiles.len());
        for spec in &file.profiles {
            let mut profile = SchedulerProfile::new(spec.name.clone());

            for name in &spec.filters {
                match lookup(&spec.name, name)? {
                    PluginInstance::Filter(filter) => profile = profile.with_filter(filter),
                    _ => return Err(wrong_kind(name, "filter")),
                }
            }

            for scorer_ref in &spec.scorers {
                match lookup(&spec.name, &scorer_ref.plugin)? {
                    PluginInstance::Scorer(scorer) => {
                        profile = profile.with_scorer(scorer, scorer_ref.weight)?;
                    }
                    _ => return Err(wrong_kind(&scorer_ref.plugin, "scorer")),
                }
            }

            if let Some(name) = &spec.picker {
                match lookup(&spec.name, name)? {
                    PluginInstance::Picker(picker) => profile = profile.with_picker(picker),
                    _ => return Err(wrong_kind(name, "picker")),
                }
            }

            profiles.push(profile);
        }

        let mut names: Vec<String> = file.profiles.iter().map(|p| p.name.clone()).collect();
        names.sort();
        if let Some(dup) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateProfile(dup[0].clone()));
        }

        let handler = registry.instantiate_handler(&file.handler, &names)?;
        info!(
            handler = %handler.typed_name(),
            profiles = names.len(),
            plugins = instances.len(),
            "scheduler configuration loaded"
        );

        Self::new(handler, profiles)
    }

    pub fn handler(&self) -> &Arc<dyn ProfileHandler> {
        &self.handler
    }

    pub fn profiles(&self) -> &ProfileMap {
        &self.profiles
    }
}

impl std::fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("handler", &self.handler.typed_name().to_string())
            .field("profiles", &self.profiles.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn wrong_kind(plugin: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongPluginKind {
        plugin: plugin.to_string(),
        expected,
    }
}
