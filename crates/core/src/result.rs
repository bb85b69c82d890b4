//! Execution result model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::id::RunId;
use crate::task::{Params, Task};
use crate::Time;

/// Terminal outcome recorded in the execution log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    /// Capability returned outputs
    Completed,
    /// Capability reported an error
    Failed,
}

/// One entry per attempted task, in attempt order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Task id
    pub task_id: String,

    /// Task display name
    pub task_name: String,

    /// Outcome
    pub status: LogStatus,

    /// Outputs on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Params>,

    /// Error message on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the task reached its terminal state
    pub finished_at: Time,
}

impl LogEntry {
    /// Entry for a completed task.
    pub fn completed(task: &Task, outputs: Params) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            status: LogStatus::Completed,
            outputs: Some(outputs),
            error: None,
            finished_at: chrono::Utc::now(),
        }
    }

    /// Entry for a failed task.
    pub fn failed(task: &Task, error: impl Into<String>) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            status: LogStatus::Failed,
            outputs: None,
            error: Some(error.into()),
            finished_at: chrono::Utc::now(),
        }
    }
}

/// Aggregate outcome of running a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Identifier of this run
    pub run_id: RunId,

    /// task id -> outputs, for Completed tasks only
    pub results: BTreeMap<String, Params>,

    /// Attempted tasks, in attempt order
    pub execution_log: Vec<LogEntry>,

    /// Final state of every task in the plan
    pub tasks: Vec<Task>,

    /// Number of Completed tasks
    pub completed: usize,

    /// Number of Failed tasks
    pub failed: usize,

    /// Run start
    pub started_at: Time,

    /// Run end
    pub finished_at: Time,
}

impl ExecutionResult {
    /// Whether every attempted task completed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Final state of a task.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_entry_completed_shape() {
        let task = Task::new("a", "ocr").with_name("Text Recognition");
        let mut out = Params::new();
        out.insert("text".to_string(), json!("hi"));

        let entry = LogEntry::completed(&task, out);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["task_name"], "Text Recognition");
        assert_eq!(value["status"], "completed");
        assert_eq!(value["outputs"]["text"], "hi");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_log_entry_failed_shape() {
        let task = Task::new("a", "ocr");
        let entry = LogEntry::failed(&task, "no image");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"], "no image");
        assert!(value.get("outputs").is_none());
    }
}
