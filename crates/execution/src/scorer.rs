//! Confidence and duration estimation.

use std::collections::{HashMap, HashSet};

use taskweave_core::{DurationEstimate, Plan, Task};
use taskweave_tools::{CapabilityRegistry, DEFAULT_EXPECTED_DURATION_SECS};

/// Starting confidence before adjustments.
pub const BASE_CONFIDENCE: f64 = 0.8;
/// Added per sequenced task whose tool is registered.
pub const KNOWN_TOOL_BONUS: f64 = 0.02;
/// Subtracted per sequenced task whose tool is not registered.
pub const UNKNOWN_TOOL_PENALTY: f64 = 0.1;
/// Weight of the tool-adjusted confidence in the final blend.
pub const TOOL_WEIGHT: f64 = 0.7;
/// Weight of the dependency satisfaction ratio in the final blend.
pub const DEPENDENCY_WEIGHT: f64 = 0.3;

/// Computes a plan's confidence and duration estimate.
pub struct PlanScorer<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> PlanScorer<'a> {
    /// Create a scorer against a registry.
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Score a plan that already has its sequence and groups.
    pub fn score(&self, plan: &Plan) -> (f64, DurationEstimate) {
        (
            self.confidence(&plan.tasks, &plan.sequence),
            self.estimate(&plan.tasks, &plan.sequence, &plan.parallel_groups),
        )
    }

    /// Heuristic confidence in [0, 1].
    ///
    /// The dependency blend only applies when at least one dependency is
    /// declared; otherwise the tool-adjusted value is used as is.
    pub fn confidence(&self, tasks: &[Task], sequence: &[String]) -> f64 {
        let tools = tools_by_id(tasks);

        let mut confidence = BASE_CONFIDENCE;
        for id in sequence {
            match tools.get(id.as_str()) {
                Some(tool) if self.registry.contains(tool) => confidence += KNOWN_TOOL_BONUS,
                _ => confidence -= UNKNOWN_TOOL_PENALTY,
            }
        }

        let sequenced: HashSet<&str> = sequence.iter().map(String::as_str).collect();
        let (satisfied, total) = tasks
            .iter()
            .flat_map(|t| t.dependencies.iter())
            .fold((0usize, 0usize), |(sat, tot), dep| {
                (sat + usize::from(sequenced.contains(dep.as_str())), tot + 1)
            });

        if total > 0 {
            let ratio = satisfied as f64 / total as f64;
            confidence = confidence * TOOL_WEIGHT + ratio * DEPENDENCY_WEIGHT;
        }

        confidence.clamp(0.0, 1.0)
    }

    /// Sequential, parallel and total duration in seconds.
    pub fn estimate(
        &self,
        tasks: &[Task],
        sequence: &[String],
        groups: &[Vec<String>],
    ) -> DurationEstimate {
        let tools = tools_by_id(tasks);
        let duration = |id: &String| {
            tools
                .get(id.as_str())
                .map(|tool| self.registry.expected_duration(tool))
                .unwrap_or(DEFAULT_EXPECTED_DURATION_SECS)
        };

        let sequential_seconds: f64 = sequence.iter().map(duration).sum();

        let mut parallel_seconds = 0.0;
        let mut parallel_savings_seconds = 0.0;
        for group in groups {
            let durations: Vec<f64> = group.iter().map(duration).collect();
            let slowest = durations.iter().copied().fold(0.0, f64::max);
            parallel_seconds += slowest;
            parallel_savings_seconds += durations.iter().sum::<f64>() - slowest;
        }

        DurationEstimate {
            sequential_seconds,
            parallel_seconds,
            total_seconds: sequential_seconds + parallel_seconds,
            parallel_savings_seconds,
        }
    }
}

fn tools_by_id(tasks: &[Task]) -> HashMap<&str, &str> {
    let mut tools = HashMap::with_capacity(tasks.len());
    for task in tasks {
        tools.entry(task.id.as_str()).or_insert(task.tool.as_str());
    }
    tools
}
