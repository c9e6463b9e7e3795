//! Scheduler configuration file parser.
//!
//! The file names plugin instances, groups them into profiles and selects a
//! profile handler. Turning it into live plugin objects is the job of the
//! plugin registry in `infergate-scheduling`.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfigFile {
    pub handler: HandlerConfig,
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    #[serde(default)]
    pub profiles: Vec<ProfileSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerConfig {
    #[serde(rename = "type")]
    pub handler_type: String,
    /// Profile order, used by the fallback handler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub parameters: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub name: String,
    /// Defaults to a max-score picker when absent.
    pub picker: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scorers: Vec<ScorerRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerRef {
    pub plugin: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl SchedulingConfigFile {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: SchedulingConfigFile = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A single-profile configuration that picks the least loaded pod by the
    /// given metric.
    pub fn scaffold(metric: &str) -> Self {
        let mut parameters = toml::Table::new();
        parameters.insert("metric".to_string(), toml::Value::String(metric.to_string()));

        SchedulingConfigFile {
            handler: HandlerConfig {
                handler_type: "single".to_string(),
                order: Vec::new(),
            },
            plugins: vec![
                PluginSpec {
                    name: format!("{metric}-scorer"),
                    plugin_type: "metric-scorer".to_string(),
                    parameters,
                },
                PluginSpec {
                    name: "picker".to_string(),
                    plugin_type: "max-score".to_string(),
                    parameters: toml::Table::new(),
                },
            ],
            profiles: vec![ProfileSpec {
                name: "default".to_string(),
                picker: Some("picker".to_string()),
                filters: Vec::new(),
                scorers: vec![ScorerRef {
                    plugin: format!("{metric}-scorer"),
                    weight: 1.0,
                }],
            }],
        }
    }
}
