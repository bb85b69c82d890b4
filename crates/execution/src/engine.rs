//! The execution engine - drives every task of a plan to a terminal state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use taskweave_core::{ExecutionResult, LogEntry, Params, Plan, RunId, StatusError, Task};
use taskweave_tools::{Capability, CapabilityRegistry};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::PlanError;

/// How tasks are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// One task at a time, in `sequence` order
    #[default]
    Sequential,
    /// Ready members of a parallel group run concurrently
    Grouped,
}

/// Configuration for the execution engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dispatch strategy
    #[serde(default)]
    pub dispatch: DispatchMode,
}

/// Runs validated plans against a capability registry.
///
/// ```text
/// for each task:  merge inputs -> Pending -> Running -> invoke -> Completed | Failed
/// ```
///
/// A failing task never aborts the run. Its dependents still execute, they
/// just do not see its outputs.
pub struct ExecutionEngine {
    registry: Arc<CapabilityRegistry>,
    config: EngineConfig,
}

impl ExecutionEngine {
    /// Create an engine with the default (sequential) configuration.
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Configuration in effect.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Execute every task in the plan.
    ///
    /// Fails only for structural reasons, before any task runs. Task failures
    /// are reported inside the returned [`ExecutionResult`].
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionResult, PlanError> {
        if !plan.is_executable() {
            error!(
                "Refusing to execute invalid plan: {}",
                plan.validation.issues.join("; ")
            );
            return Err(PlanError::InvalidPlan {
                issues: plan.validation.issues.clone(),
            });
        }

        let mut run = Run::new(plan)?;
        info!(
            "Starting run {} ({} tasks, {:?} dispatch)",
            run.run_id,
            plan.sequence.len(),
            self.config.dispatch
        );

        match self.config.dispatch {
            DispatchMode::Sequential => self.run_sequential(plan, &mut run).await?,
            DispatchMode::Grouped => self.run_grouped(plan, &mut run).await?,
        }

        let result = run.finish();
        info!(
            "Run {} finished: {} completed, {} failed",
            result.run_id, result.completed, result.failed
        );
        Ok(result)
    }

    async fn run_sequential(&self, plan: &Plan, run: &mut Run) -> Result<(), PlanError> {
        for id in &plan.sequence {
            let idx = run.index_of(id)?;
            if run.tasks[idx].status.is_terminal() {
                continue;
            }

            let inputs = run.start(idx)?;
            let outcome = match self.registry.capability(&run.tasks[idx].tool) {
                Ok(capability) => join_invoke(spawn_invoke(capability, inputs)).await,
                Err(e) => Err(e.into()),
            };
            run.record(idx, outcome)?;
        }
        Ok(())
    }

    /// Repeatedly take the first group with ready members and run those
    /// members concurrently, joining them before moving on.
    async fn run_grouped(&self, plan: &Plan, run: &mut Run) -> Result<(), PlanError> {
        let mut queue: Vec<Vec<String>> = plan.parallel_groups.clone();
        let covered: HashSet<&String> = plan.parallel_groups.iter().flatten().collect();
        for id in &plan.sequence {
            if !covered.contains(id) {
                queue.push(vec![id.clone()]);
            }
        }

        loop {
            for group in &mut queue {
                group.retain(|id| !run.is_terminal(id));
            }
            queue.retain(|group| !group.is_empty());
            if queue.is_empty() {
                return Ok(());
            }

            let mut batch = Vec::new();
            for group in &mut queue {
                let (ready, waiting): (Vec<String>, Vec<String>) = std::mem::take(group)
                    .into_iter()
                    .partition(|id| run.is_ready(plan, id));
                *group = waiting;
                if !ready.is_empty() {
                    batch = ready;
                    break;
                }
            }

            if batch.is_empty() {
                let waiting: Vec<String> = queue.into_iter().flatten().collect();
                error!("No runnable task left; waiting on {}", waiting.join(", "));
                return Err(PlanError::Stalled(waiting));
            }

            self.dispatch_batch(run, &batch).await?;
        }
    }

    async fn dispatch_batch(&self, run: &mut Run, batch: &[String]) -> Result<(), PlanError> {
        debug!("Dispatching concurrently: {}", batch.join(", "));

        let mut pending: Vec<(usize, Dispatch)> = Vec::with_capacity(batch.len());
        for id in batch {
            let idx = run.index_of(id)?;
            let inputs = run.start(idx)?;
            let dispatch = match self.registry.capability(&run.tasks[idx].tool) {
                Ok(capability) => Dispatch::Spawned(spawn_invoke(capability, inputs)),
                Err(e) => Dispatch::Rejected(e.into()),
            };
            pending.push((idx, dispatch));
        }

        for (idx, dispatch) in pending {
            let outcome = match dispatch {
                Dispatch::Spawned(handle) => join_invoke(handle).await,
                Dispatch::Rejected(e) => Err(e),
            };
            run.record(idx, outcome)?;
        }
        Ok(())
    }
}

enum Dispatch {
    Spawned(JoinHandle<anyhow::Result<Params>>),
    Rejected(anyhow::Error),
}

/// Every invocation runs on its own tokio task so a panicking capability
/// fails only its own task, whatever the dispatch mode.
fn spawn_invoke(
    capability: Arc<dyn Capability>,
    inputs: Params,
) -> JoinHandle<anyhow::Result<Params>> {
    tokio::spawn(async move { capability.invoke(&inputs).await })
}

async fn join_invoke(handle: JoinHandle<anyhow::Result<Params>>) -> anyhow::Result<Params> {
    match handle.await {
        Ok(outcome) => outcome,
        Err(join) => Err(anyhow::anyhow!("Capability panicked: {}", join)),
    }
}

/// Run-local state. The plan's own tasks are never touched.
struct Run {
    run_id: RunId,
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    results: BTreeMap<String, Params>,
    log: Vec<LogEntry>,
    started_at: taskweave_core::Time,
}

impl Run {
    fn new(plan: &Plan) -> Result<Self, PlanError> {
        let tasks = plan.tasks.clone();
        let mut index = HashMap::with_capacity(tasks.len());
        for (i, task) in tasks.iter().enumerate() {
            index.entry(task.id.clone()).or_insert(i);
        }

        let run = Self {
            run_id: RunId::new(),
            tasks,
            index,
            results: BTreeMap::new(),
            log: Vec::new(),
            started_at: chrono::Utc::now(),
        };

        for id in &plan.sequence {
            run.index_of(id)?;
        }
        Ok(run)
    }

    fn index_of(&self, id: &str) -> Result<usize, PlanError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| PlanError::TaskNotFound(id.to_string()))
    }

    fn is_terminal(&self, id: &str) -> bool {
        self.index
            .get(id)
            .map(|&i| self.tasks[i].status.is_terminal())
            .unwrap_or(true)
    }

    /// Every in-plan dependency has reached a terminal state.
    fn is_ready(&self, plan: &Plan, id: &str) -> bool {
        plan.dependencies_of(id).all(|dep| self.is_terminal(dep))
    }

    /// Declared inputs, then each dependency's outputs in declaration order.
    /// Later keys overwrite earlier ones.
    fn effective_inputs(&self, idx: usize) -> Params {
        let task = &self.tasks[idx];
        let mut inputs = task.inputs.clone();
        for dep in &task.dependencies {
            if let Some(outputs) = self.results.get(dep) {
                for (key, value) in outputs {
                    inputs.insert(key.clone(), value.clone());
                }
            }
        }
        inputs
    }

    fn start(&mut self, idx: usize) -> Result<Params, StatusError> {
        let inputs = self.effective_inputs(idx);
        let task = &mut self.tasks[idx];
        task.start()?;
        debug!("Executing task: {} ({})", task.name, task.tool);
        Ok(inputs)
    }

    fn record(&mut self, idx: usize, outcome: anyhow::Result<Params>) -> Result<(), StatusError> {
        let task = &mut self.tasks[idx];
        match outcome {
            Ok(outputs) => {
                task.complete(outputs.clone())?;
                debug!("Task {} completed", task.name);
                self.results.insert(task.id.clone(), outputs.clone());
                self.log.push(LogEntry::completed(task, outputs));
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!("Task {} failed: {}", task.name, message);
                task.fail(message.clone())?;
                self.log.push(LogEntry::failed(task, message));
            }
        }
        Ok(())
    }

    fn finish(self) -> ExecutionResult {
        let completed = self.results.len();
        let failed = self.log.len() - completed;
        ExecutionResult {
            run_id: self.run_id,
            results: self.results,
            execution_log: self.log,
            tasks: self.tasks,
            completed,
            failed,
            started_at: self.started_at,
            finished_at: chrono::Utc::now(),
        }
    }
}
