//! Config and task list files.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use taskweave_core::{CapabilityInfo, ResourceLimits, TaskSpec};
use taskweave_execution::{DispatchMode, EngineConfig};
use taskweave_tools::CapabilityRegistry;
use tracing::debug;

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Limits parallel groups are built against
    pub limits: ResourceLimits,

    /// Engine dispatch strategy
    pub dispatch: DispatchMode,

    /// Descriptors merged over the standard catalog; same name replaces
    pub capabilities: Vec<CapabilityInfo>,
}

impl Config {
    /// Read a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Read the config file if one was given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Standard catalog with this config's descriptors applied on top.
    pub fn registry(&self) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::standard();
        for info in &self.capabilities {
            registry.describe(info.clone());
        }
        registry
    }

    /// Engine configuration.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            dispatch: self.dispatch,
        }
    }
}

/// Read a JSON array of task specs.
pub fn load_tasks(path: &Path) -> Result<Vec<TaskSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks: {}", path.display()))?;
    let tasks: Vec<TaskSpec> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tasks: {}", path.display()))?;
    debug!("Loaded {} tasks from {}", tasks.len(), path.display());
    Ok(tasks)
}
