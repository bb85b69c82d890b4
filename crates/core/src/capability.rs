//! Capability descriptors and resource accounting.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Resource cost of running one invocation of a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Memory units (MB in the standard catalog)
    pub memory_units: u64,
    /// CPU units (cores)
    pub cpu_units: u64,
}

impl ResourceCost {
    /// Create a cost.
    pub fn new(memory_units: u64, cpu_units: u64) -> Self {
        Self { memory_units, cpu_units }
    }
}

impl std::ops::Add for ResourceCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            memory_units: self.memory_units.saturating_add(rhs.memory_units),
            cpu_units: self.cpu_units.saturating_add(rhs.cpu_units),
        }
    }
}

impl std::iter::Sum for ResourceCost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, c| acc + c)
    }
}

/// Immutable description of a tool in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    /// Tool name tasks refer to
    pub name: String,

    /// Semantic input kinds accepted
    #[serde(default)]
    pub input_categories: Vec<String>,

    /// Semantic output kinds produced
    #[serde(default)]
    pub output_categories: Vec<String>,

    /// Default ordering hints, distinct from a task's own dependencies
    #[serde(default)]
    pub declared_dependencies: Vec<String>,

    /// Cost of one invocation
    #[serde(default)]
    pub resource_cost: ResourceCost,

    /// Expected wall time of one invocation
    #[serde(default)]
    pub expected_duration_seconds: f64,
}

impl CapabilityInfo {
    /// Create a descriptor with no categories and zero cost.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input_categories: Vec::new(),
            output_categories: Vec::new(),
            declared_dependencies: Vec::new(),
            resource_cost: ResourceCost::default(),
            expected_duration_seconds: 0.0,
        }
    }

    /// Set accepted input categories.
    pub fn with_inputs<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set produced output categories.
    pub fn with_outputs<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Set declared ordering hints.
    pub fn with_declared_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Set resource cost.
    pub fn with_cost(mut self, memory_units: u64, cpu_units: u64) -> Self {
        self.resource_cost = ResourceCost::new(memory_units, cpu_units);
        self
    }

    /// Set expected duration.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.expected_duration_seconds = seconds;
        self
    }
}

const DEFAULT_MAX_PARALLEL: NonZeroUsize = match NonZeroUsize::new(2) {
    Some(n) => n,
    None => unreachable!(),
};

/// Limits a parallel group must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Max tasks per group
    #[serde(default = "default_max_parallel")]
    pub max_parallel: NonZeroUsize,
    /// Max summed memory units per group
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u64,
    /// Max summed cpu units per group
    #[serde(default = "default_cpu_limit")]
    pub cpu_limit: u64,
}

fn default_max_parallel() -> NonZeroUsize {
    DEFAULT_MAX_PARALLEL
}

fn default_memory_limit() -> u64 {
    4096
}

fn default_cpu_limit() -> u64 {
    4
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            memory_limit: default_memory_limit(),
            cpu_limit: default_cpu_limit(),
        }
    }
}

impl ResourceLimits {
    /// Create limits with the defaults (2 tasks, 4096 memory, 4 cpu).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max tasks per group.
    pub fn with_max_parallel(mut self, max: NonZeroUsize) -> Self {
        self.max_parallel = max;
        self
    }

    /// Set memory limit.
    pub fn with_memory_limit(mut self, limit: u64) -> Self {
        self.memory_limit = limit;
        self
    }

    /// Set cpu limit.
    pub fn with_cpu_limit(mut self, limit: u64) -> Self {
        self.cpu_limit = limit;
        self
    }

    /// Whether a group of `count` tasks with the summed `cost` fits.
    pub fn admits(&self, count: usize, cost: ResourceCost) -> bool {
        count <= self.max_parallel.get()
            && cost.memory_units <= self.memory_limit
            && cost.cpu_units <= self.cpu_limit
    }
}
