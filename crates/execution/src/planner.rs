//! Plan construction pipeline.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use taskweave_core::{Plan, ResourceCost, ResourceLimits, Task, TaskStatus, Validation};
use taskweave_tools::CapabilityRegistry;
use tracing::{debug, info, warn};

use crate::dependency::DependencyGraph;
use crate::scheduler::ParallelGrouper;
use crate::scorer::PlanScorer;
use crate::validator::PlanValidator;

/// Fixed confidence of a degraded plan.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Warning carried by every degraded plan.
pub const FALLBACK_WARNING: &str = "Fallback plan - may not be optimal";

/// Turns a task list into a validated, scored [`Plan`].
///
/// Build the graph, sort it, group the order under the resource limits,
/// validate, then score. Every step is a pure function of the task list,
/// the registry and the limits.
pub struct Planner {
    registry: Arc<CapabilityRegistry>,
    limits: ResourceLimits,
}

impl Planner {
    /// Create a planner with default limits.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            limits: ResourceLimits::default(),
        }
    }

    /// Set resource limits.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Registry plans are checked against.
    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Limits groups are built against.
    pub fn limits(&self) -> ResourceLimits {
        self.limits
    }

    /// Build a plan.
    ///
    /// An invalid plan is still returned in full so callers can inspect it;
    /// its confidence is 0.
    pub fn plan<I, T>(&self, tasks: I) -> Plan
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        let tasks: Vec<Task> = tasks.into_iter().map(|t| pending(t.into())).collect();

        let graph = DependencyGraph::build(&tasks);
        let sorted = graph.topological_sort();

        // Tasks caught in a cycle are grouped after the sorted ones so that
        // every task still lands in exactly one group.
        let mut grouping_order = sorted.order.clone();
        grouping_order.extend(graph.unordered(&sorted).into_iter().map(String::from));

        let costs = self.costs(&tasks);
        let grouping =
            ParallelGrouper::new(self.limits).group(&grouping_order, graph.dependencies(), &costs);

        let validation = PlanValidator::new(&self.registry)
            .with_limits(self.limits)
            .validate(&tasks, &graph, &sorted);

        let scorer = PlanScorer::new(&self.registry);
        let confidence = if validation.valid {
            scorer.confidence(&tasks, &sorted.order)
        } else {
            0.0
        };
        let duration_estimate = scorer.estimate(&tasks, &sorted.order, &grouping.groups);

        let plan = Plan {
            tasks,
            sequence: sorted.order,
            parallel_groups: grouping.groups,
            dependency_graph: graph.dependencies().clone(),
            limits: self.limits,
            optimizations: grouping.optimizations,
            validation,
            confidence,
            duration_estimate,
            fallback: false,
        };

        if plan.validation.valid {
            info!(
                "Planned {} tasks in {} groups (confidence {:.2})",
                plan.sequence.len(),
                plan.parallel_groups.len(),
                plan.confidence
            );
        } else {
            warn!("Plan is invalid: {}", plan.validation.issues.join("; "));
        }

        plan
    }

    /// Degraded plan for best-effort continuation.
    ///
    /// Every task whose tool is registered runs in input order. No groups,
    /// no dependency edges, fixed confidence.
    pub fn fallback_plan<I, T>(&self, tasks: I) -> Plan
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        let mut seen = HashSet::new();
        let tasks: Vec<Task> = tasks
            .into_iter()
            .map(|t| pending(t.into()))
            .filter(|t| self.registry.contains(&t.tool))
            .filter(|t| seen.insert(t.id.clone()))
            .collect();
        let sequence: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();

        let duration_estimate = PlanScorer::new(&self.registry).estimate(&tasks, &sequence, &[]);
        debug!("Fallback plan covers {} tasks", sequence.len());

        Plan {
            tasks,
            sequence,
            parallel_groups: Vec::new(),
            dependency_graph: BTreeMap::new(),
            limits: self.limits,
            optimizations: Vec::new(),
            validation: Validation::new(Vec::new(), vec![FALLBACK_WARNING.to_string()]),
            confidence: FALLBACK_CONFIDENCE,
            duration_estimate,
            fallback: true,
        }
    }

    /// The normal plan when valid, otherwise the degraded one.
    pub fn plan_or_fallback<I, T>(&self, tasks: I) -> Plan
    where
        I: IntoIterator<Item = T>,
        T: Into<Task>,
    {
        let tasks: Vec<Task> = tasks.into_iter().map(Into::into).collect();
        let plan = self.plan(tasks.clone());
        if plan.validation.valid {
            return plan;
        }

        warn!("Falling back to a degraded plan");
        self.fallback_plan(tasks)
    }

    fn costs(&self, tasks: &[Task]) -> HashMap<String, ResourceCost> {
        let mut costs = HashMap::with_capacity(tasks.len());
        for task in tasks {
            costs
                .entry(task.id.clone())
                .or_insert_with(|| self.registry.resource_cost(&task.tool));
        }
        costs
    }
}

/// Drop any runtime state a task carries in.
fn pending(mut task: Task) -> Task {
    task.status = TaskStatus::Pending;
    task.outputs = None;
    task.error = None;
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use taskweave_core::{CapabilityInfo, TaskSpec};

    fn planner() -> Planner {
        Planner::new(Arc::new(CapabilityRegistry::standard()))
    }

    fn diamond() -> Vec<Task> {
        vec![
            Task::new("a", "vision_detect"),
            Task::new("b", "ocr").depends_on("a"),
            Task::new("c", "nl2api").depends_on("a"),
            Task::new("d", "doc_gen").depends_on("b").depends_on("c"),
        ]
    }

    fn position(plan: &Plan, id: &str) -> usize {
        plan.sequence.iter().position(|s| s == id).unwrap()
    }

    #[test]
    fn test_diamond_plan() {
        let plan = planner().plan(diamond());

        assert!(plan.validation.valid);
        assert_eq!(plan.sequence, vec!["a", "b", "c", "d"]);
        assert_eq!(position(&plan, "a"), 0);
        assert_eq!(position(&plan, "d"), 3);
        assert!(plan
            .parallel_groups
            .iter()
            .any(|g| g.contains(&"b".to_string()) && g.contains(&"c".to_string())));
        assert!((plan.confidence - 0.916).abs() < 1e-9);
        assert!(!plan.fallback);
    }

    #[test]
    fn test_sequence_respects_dependencies() {
        let tasks = vec![
            Task::new("lint", "quality").depends_on("code"),
            Task::new("code", "ui2code").depends_on("layout").depends_on("text"),
            Task::new("layout", "vision_detect"),
            Task::new("text", "ocr"),
            Task::new("write", "file_ops").depends_on("lint").depends_on("docs"),
            Task::new("docs", "doc_gen").depends_on("code"),
        ];
        let plan = planner().plan(tasks.clone());

        assert!(plan.validation.valid);
        assert_eq!(plan.sequence.len(), tasks.len());
        for task in &tasks {
            for dep in &task.dependencies {
                assert!(position(&plan, dep) < position(&plan, &task.id));
            }
        }
    }

    #[test]
    fn test_cycle_plan_is_invalid() {
        let tasks = vec![
            Task::new("x", "ocr").depends_on("y"),
            Task::new("y", "ocr").depends_on("x"),
        ];
        let plan = planner().plan(tasks);

        assert!(!plan.validation.valid);
        assert!(plan
            .validation
            .issues
            .contains(&"circular dependencies detected".to_string()));
        assert_eq!(plan.confidence, 0.0);
        assert!(plan.sequence.is_empty());

        let grouped: Vec<&String> = plan.parallel_groups.iter().flatten().collect();
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_unknown_tool_plan_is_invalid() {
        let plan = planner().plan(vec![Task::new("t", "teleport")]);

        assert!(!plan.validation.valid);
        assert_eq!(plan.validation.issues, vec!["Unknown tool: teleport"]);
        assert_eq!(plan.confidence, 0.0);
        assert!((plan.duration_estimate.sequential_seconds - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_dangling_dependency_still_valid() {
        let plan = planner().plan(vec![Task::new("docs", "doc_gen").depends_on("ghost")]);

        assert!(plan.validation.valid);
        assert_eq!(plan.validation.total_warnings(), 1);
        assert_eq!(plan.sequence, vec!["docs"]);
        assert!(plan.dependency_graph["docs"].is_empty());
    }

    #[test]
    fn test_groups_cover_every_task_within_limits() {
        let limits = ResourceLimits::new()
            .with_max_parallel(NonZeroUsize::new(3).unwrap())
            .with_memory_limit(1500)
            .with_cpu_limit(3);
        let planner = planner().with_limits(limits);
        assert_eq!(planner.limits(), limits);
        let tasks: Vec<Task> = ["vision_detect", "ocr", "nl2api", "quality", "doc_gen", "file_ops", "ocr"]
            .iter()
            .enumerate()
            .map(|(i, tool)| Task::new(format!("t{}", i), *tool))
            .collect();
        let plan = planner.plan(tasks);

        let mut covered: Vec<&String> = plan.parallel_groups.iter().flatten().collect();
        covered.sort();
        covered.dedup();
        assert_eq!(covered.len(), 7);
        assert_eq!(plan.parallel_groups.iter().map(Vec::len).sum::<usize>(), 7);

        for group in &plan.parallel_groups {
            let cost: ResourceCost = group
                .iter()
                .map(|id| planner.registry().resource_cost(&plan.task(id).unwrap().tool))
                .sum();
            assert!(limits.admits(group.len(), cost), "group {:?} breaks limits", group);
        }
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = planner();
        let first = planner.plan(diamond());
        let second = planner.plan(diamond());

        assert_eq!(first.sequence, second.sequence);
        assert_eq!(first.parallel_groups, second.parallel_groups);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn test_plan_resets_task_state() {
        let mut done = Task::new("a", "ocr");
        done.start().unwrap();
        done.complete(Default::default()).unwrap();

        let plan = planner().plan(vec![done]);
        assert_eq!(plan.tasks[0].status, TaskStatus::Pending);
        assert!(plan.tasks[0].outputs.is_none());
    }

    #[test]
    fn test_plan_from_specs() {
        let specs: Vec<TaskSpec> =
            serde_json::from_str(r#"[{"id": "a", "tool": "ocr"}, {"id": "b", "tool": "quality", "dependencies": ["a"]}]"#)
                .unwrap();
        let plan = planner().plan(specs);

        assert!(plan.validation.valid);
        assert_eq!(plan.sequence, vec!["a", "b"]);
    }

    #[test]
    fn test_fallback_plan() {
        let tasks = vec![
            Task::new("x", "ocr").depends_on("y"),
            Task::new("y", "quality").depends_on("x"),
            Task::new("z", "teleport"),
        ];
        let plan = planner().fallback_plan(tasks);

        assert!(plan.fallback);
        assert!(plan.validation.valid);
        assert_eq!(plan.validation.warnings, vec![FALLBACK_WARNING]);
        assert_eq!(plan.sequence, vec!["x", "y"]);
        assert!(plan.parallel_groups.is_empty());
        assert!(plan.dependency_graph.is_empty());
        assert_eq!(plan.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_plan_or_fallback() {
        let planner = planner();
        assert!(!planner.plan_or_fallback(diamond()).fallback);

        let cyclic = vec![
            Task::new("x", "ocr").depends_on("y"),
            Task::new("y", "ocr").depends_on("x"),
        ];
        assert!(planner.plan_or_fallback(cyclic).fallback);
    }

    #[test]
    fn test_oversized_task_warns() {
        let mut registry = CapabilityRegistry::standard();
        registry.describe(CapabilityInfo::new("render").with_cost(8192, 1));
        let plan = Planner::new(Arc::new(registry)).plan(vec![Task::new("big", "render")]);

        assert!(plan.validation.valid);
        assert_eq!(plan.limits, ResourceLimits::default());
        assert_eq!(plan.parallel_groups, vec![vec!["big".to_string()]]);
        assert_eq!(
            plan.validation.warnings,
            vec!["Task big exceeds resource limits on its own"]
        );
    }
}
