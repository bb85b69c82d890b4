//! Plan validation.

use std::collections::HashSet;

use taskweave_core::{ResourceLimits, Task, Validation};
use taskweave_tools::CapabilityRegistry;
use tracing::warn;

use crate::dependency::{DependencyGraph, TopologicalOrder};

/// Issue text reported when the scheduler could not order every task.
pub const CYCLE_ISSUE: &str = "circular dependencies detected";

/// Checks a task list and its derived graph for structural problems.
pub struct PlanValidator<'a> {
    registry: &'a CapabilityRegistry,
    limits: ResourceLimits,
}

impl<'a> PlanValidator<'a> {
    /// Create a validator against a registry.
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self {
            registry,
            limits: ResourceLimits::default(),
        }
    }

    /// Set the limits used for the oversized-task check.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Produce the verdict.
    ///
    /// Issues: duplicate ids, unknown tools, cycles. Warnings: dangling
    /// dependencies and tasks too large for any group.
    pub fn validate(
        &self,
        tasks: &[Task],
        graph: &DependencyGraph,
        sorted: &TopologicalOrder,
    ) -> Validation {
        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        for id in graph.duplicates() {
            issues.push(format!("Duplicate task id: {}", id));
        }

        let mut reported = HashSet::new();
        for task in tasks {
            if !self.registry.contains(&task.tool) && reported.insert(task.tool.as_str()) {
                issues.push(format!("Unknown tool: {}", task.tool));
            }
        }

        let cycle = if sorted.ok {
            None
        } else {
            issues.push(CYCLE_ISSUE.to_string());
            graph.find_cycle()
        };

        for dangling in graph.dangling() {
            warn!(
                "Task {} depends on {}, which is not in the plan",
                dangling.task_id, dangling.dependency
            );
            warnings.push(format!(
                "Dependency {} for {} not in execution plan",
                dangling.dependency, dangling.task_id
            ));
        }

        let mut checked = HashSet::new();
        for task in tasks {
            if !checked.insert(task.id.as_str()) || !self.registry.contains(&task.tool) {
                continue;
            }
            if !self.limits.admits(1, self.registry.resource_cost(&task.tool)) {
                warnings.push(format!("Task {} exceeds resource limits on its own", task.id));
            }
        }

        Validation::new(issues, warnings).with_cycle(cycle)
    }
}
