pub mod schedule;
pub mod validate;

use std::path::Path;

use anyhow::Context;

use infergate_core::SchedulingConfigFile;
use infergate_scheduling::{PluginRegistry, SchedulerConfig};

/// Parse a config file and build live plugins from it.
pub fn load_config(path: &str) -> anyhow::Result<SchedulerConfig> {
    let file = SchedulingConfigFile::from_file(Path::new(path))
        .with_context(|| format!("failed to read scheduler config {path}"))?;
    let config = SchedulerConfig::from_file_config(&file, &PluginRegistry::with_builtins())
        .with_context(|| format!("invalid scheduler config {path}"))?;
    Ok(config)
}
