//! Resource-constrained parallel grouping.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use taskweave_core::{ResourceCost, ResourceLimits};
use tracing::{debug, warn};

/// Output of the grouper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    /// Groups covering every task exactly once
    pub groups: Vec<Vec<String>>,
    /// One note per multi-task candidate group: kept or split
    pub optimizations: Vec<String>,
}

/// Partitions an ordered task list into groups that may run concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelGrouper {
    limits: ResourceLimits,
}

impl ParallelGrouper {
    /// Create a grouper for the given limits.
    pub fn new(limits: ResourceLimits) -> Self {
        Self { limits }
    }

    /// Limits in effect.
    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Group `order` into dependency-free, resource-bounded groups.
    ///
    /// `costs` maps task id to the cost of its tool; missing entries cost
    /// nothing.
    pub fn group(
        &self,
        order: &[String],
        dependency_graph: &BTreeMap<String, BTreeSet<String>>,
        costs: &HashMap<String, ResourceCost>,
    ) -> Grouping {
        let mut grouping = Grouping::default();

        for candidate in candidate_groups(order, dependency_graph) {
            let fitted = self.fit(candidate, costs, &mut grouping.optimizations);
            grouping.groups.extend(fitted);
        }

        debug!(
            "Grouped {} tasks into {} groups",
            order.len(),
            grouping.groups.len()
        );
        grouping
    }

    /// Keep a candidate group as is, or split it when it breaks a limit.
    fn fit(
        &self,
        group: Vec<String>,
        costs: &HashMap<String, ResourceCost>,
        notes: &mut Vec<String>,
    ) -> Vec<Vec<String>> {
        let cost_of = |id: &str| costs.get(id).copied().unwrap_or_default();
        let total: ResourceCost = group.iter().map(|id| cost_of(id)).sum();

        if self.limits.admits(group.len(), total) {
            if group.len() > 1 {
                notes.push(format!(
                    "Parallelized {} tasks: {}",
                    group.len(),
                    group.join(", ")
                ));
            }
            return vec![group];
        }

        warn!("Splitting resource-intensive group: {}", group.join(", "));
        notes.push(format!("Split resource-intensive group: {}", group.join(", ")));

        // Heaviest first; the sort is stable so equal costs keep their order.
        let mut members = group;
        members.sort_by(|a, b| cost_of(b).memory_units.cmp(&cost_of(a).memory_units));

        let mut split: Vec<Vec<String>> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_cost = ResourceCost::default();

        for id in members {
            let cost = cost_of(&id);
            if !current.is_empty() && !self.limits.admits(current.len() + 1, current_cost + cost) {
                split.push(std::mem::take(&mut current));
                current_cost = ResourceCost::default();
            }
            current_cost = current_cost + cost;
            current.push(id);
        }

        if !current.is_empty() {
            split.push(current);
        }

        split
    }
}

/// Step 1: walk `order`, gathering each ungrouped task with every later
/// ungrouped task that shares no dependency edge with any member so far.
fn candidate_groups(
    order: &[String],
    dependency_graph: &BTreeMap<String, BTreeSet<String>>,
) -> Vec<Vec<String>> {
    let depends = |a: &str, b: &str| {
        dependency_graph
            .get(a)
            .map(|deps| deps.contains(b))
            .unwrap_or(false)
    };
    let independent = |a: &str, b: &str| !depends(a, b) && !depends(b, a);

    let mut grouped: HashSet<&str> = HashSet::new();
    let mut groups = Vec::new();

    for (i, task) in order.iter().enumerate() {
        if !grouped.insert(task) {
            continue;
        }

        let mut group = vec![task.clone()];
        for candidate in &order[i + 1..] {
            if grouped.contains(candidate.as_str()) {
                continue;
            }
            if group.iter().all(|member| independent(member, candidate)) {
                grouped.insert(candidate);
                group.push(candidate.clone());
            }
        }

        groups.push(group);
    }

    groups
}
