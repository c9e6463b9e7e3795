use std::path::Path;

use serde::Serialize;

use infergate_core::SchedulingConfigFile;
use infergate_scheduling::{Plugin, SchedulerConfig};

use super::load_config;

#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub handler: String,
    pub profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Serialize)]
pub struct ProfileSummary {
    pub name: String,
    pub filters: Vec<String>,
    pub scorers: Vec<ScorerSummary>,
    pub picker: String,
}

#[derive(Debug, Serialize)]
pub struct ScorerSummary {
    pub plugin: String,
    pub weight: f64,
}

impl ConfigSummary {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let profiles = config
            .profiles()
            .values()
            .map(|profile| ProfileSummary {
                name: profile.name().to_string(),
                filters: profile
                    .filters()
                    .iter()
                    .map(|f| f.typed_name().to_string())
                    .collect(),
                scorers: profile
                    .scorers()
                    .iter()
                    .map(|s| ScorerSummary {
                        plugin: s.scorer.typed_name().to_string(),
                        weight: s.weight,
                    })
                    .collect(),
                picker: profile.picker().typed_name().to_string(),
            })
            .collect();

        Self {
            handler: config.handler().typed_name().to_string(),
            profiles,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("✓ Config OK (handler: {})\n", self.handler);
        for profile in &self.profiles {
            out.push_str(&format!("  profile {}\n", profile.name));
            if !profile.filters.is_empty() {
                out.push_str(&format!("    filters: {}\n", profile.filters.join(", ")));
            }
            for scorer in &profile.scorers {
                out.push_str(&format!("    scorer:  {} x{}\n", scorer.plugin, scorer.weight));
            }
            out.push_str(&format!("    picker:  {}\n", profile.picker));
        }
        out
    }
}

pub fn validate(path: &str, format: &str) -> anyhow::Result<()> {
    let config = load_config(path)?;
    let summary = ConfigSummary::from_config(&config);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            print!("{}", summary.render_text());
        }
    }

    Ok(())
}

pub fn init(metric: &str, output: &str) -> anyhow::Result<()> {
    let output = Path::new(output);
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }

    let scaffold = SchedulingConfigFile::scaffold(metric);
    std::fs::write(output, scaffold.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}
