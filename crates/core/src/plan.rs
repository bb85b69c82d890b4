//! Plan model - the scheduling artifact derived from a task list.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::capability::ResourceLimits;
use crate::task::Task;

/// Verdict of plan validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Validation {
    /// True when there are no issues
    pub valid: bool,

    /// Hard failures; any issue blocks execution
    pub issues: Vec<String>,

    /// Non-fatal findings
    pub warnings: Vec<String>,

    /// One offending cycle, first node repeated at the end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle: Option<Vec<String>>,
}

impl Validation {
    /// Build a verdict; `valid` is derived from `issues`.
    pub fn new(issues: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
            warnings,
            cycle: None,
        }
    }

    /// Attach the cycle found during validation.
    pub fn with_cycle(mut self, cycle: Option<Vec<String>>) -> Self {
        self.cycle = cycle;
        self
    }

    /// Number of issues.
    pub fn total_issues(&self) -> usize {
        self.issues.len()
    }

    /// Number of warnings.
    pub fn total_warnings(&self) -> usize {
        self.warnings.len()
    }
}

/// Duration estimate for a plan, in seconds.
///
/// `total_seconds` adds the sequential and parallel figures even though the
/// same tasks appear in both; it is a pessimistic bound, not a makespan.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DurationEstimate {
    /// Sum of every sequenced task's expected duration
    pub sequential_seconds: f64,
    /// Sum over groups of the slowest member's expected duration
    pub parallel_seconds: f64,
    /// `sequential_seconds + parallel_seconds`
    pub total_seconds: f64,
    /// Sum over groups of (member total - slowest member)
    pub parallel_savings_seconds: f64,
}

/// The validated, scored, ordered artifact handed to the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Tasks in input order, all Pending
    pub tasks: Vec<Task>,

    /// Topological order of task ids
    pub sequence: Vec<String>,

    /// Disjoint groups safe to run concurrently
    pub parallel_groups: Vec<Vec<String>>,

    /// task id -> in-plan dependency ids
    pub dependency_graph: BTreeMap<String, BTreeSet<String>>,

    /// Limits the groups were built against
    pub limits: ResourceLimits,

    /// Notes describing how candidate groups were kept or split
    #[serde(default)]
    pub optimizations: Vec<String>,

    /// Validation verdict
    pub validation: Validation,

    /// Heuristic quality score in [0, 1]
    pub confidence: f64,

    /// Duration estimate
    pub duration_estimate: DurationEstimate,

    /// True for a degraded best-effort plan
    #[serde(default)]
    pub fallback: bool,
}

impl Plan {
    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Whether the engine may run this plan.
    pub fn is_executable(&self) -> bool {
        self.validation.valid
    }

    /// In-plan dependencies of `id`.
    pub fn dependencies_of(&self, id: &str) -> impl Iterator<Item = &String> {
        self.dependency_graph.get(id).into_iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_valid_iff_no_issues() {
        let ok = Validation::new(vec![], vec!["w".to_string()]);
        assert!(ok.valid);
        assert_eq!(ok.total_warnings(), 1);

        let bad = Validation::new(vec!["Unknown tool: x".to_string()], vec![]);
        assert!(!bad.valid);
        assert_eq!(bad.total_issues(), 1);
    }

    #[test]
    fn test_validation_cycle_is_skipped_when_absent() {
        let json = serde_json::to_value(Validation::new(vec![], vec![])).unwrap();
        assert!(json.get("cycle").is_none());
    }
}
