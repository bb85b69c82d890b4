//! Task model - the unit of work bound to a capability.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named parameters passed into and out of a capability.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Declarative task definition, as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Unique identifier within a plan
    pub id: String,

    /// Human-readable label
    #[serde(default)]
    pub name: String,

    /// Capability the task is bound to
    pub tool: String,

    /// Parameters supplied at definition time
    #[serde(default)]
    pub inputs: Params,

    /// Ids of tasks whose outputs must be available first
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Lifecycle of a task inside a single plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Not dispatched yet
    #[default]
    Pending,
    /// Capability invocation in flight
    Running,
    /// Finished with outputs
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    /// Whether the status is final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Rejected status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Task {task_id} cannot move from {from} to {to}")]
pub struct StatusError {
    /// Task whose transition was rejected
    pub task_id: String,
    /// Current status
    pub from: TaskStatus,
    /// Requested status
    pub to: TaskStatus,
}

/// A task owned by a plan, carrying its runtime state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier within a plan
    pub id: String,

    /// Human-readable label (not used for identity)
    pub name: String,

    /// Capability the task is bound to
    pub tool: String,

    /// Parameters supplied at definition time
    pub inputs: Params,

    /// Ids of tasks whose outputs must be available first
    pub dependencies: Vec<String>,

    /// Current status
    pub status: TaskStatus,

    /// Results, set once Completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Params>,

    /// Failure message, set once Failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Create a pending task bound to `tool`.
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            tool: tool.into(),
            inputs: Params::new(),
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            outputs: None,
            error: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a declared input.
    pub fn with_input(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(key.into(), value);
        self
    }

    /// Add a dependency on another task.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Pending -> Running.
    pub fn start(&mut self) -> Result<(), StatusError> {
        self.transition(TaskStatus::Running)
    }

    /// Running -> Completed, recording outputs.
    pub fn complete(&mut self, outputs: Params) -> Result<(), StatusError> {
        self.transition(TaskStatus::Completed)?;
        self.outputs = Some(outputs);
        Ok(())
    }

    /// Running -> Failed, recording the error message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), StatusError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), StatusError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusError {
                task_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl From<TaskSpec> for Task {
    fn from(spec: TaskSpec) -> Self {
        let name = if spec.name.is_empty() {
            spec.id.clone()
        } else {
            spec.name
        };

        Self {
            id: spec.id,
            name,
            tool: spec.tool,
            inputs: spec.inputs,
            dependencies: spec.dependencies,
            status: TaskStatus::Pending,
            outputs: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_new_defaults() {
        let task = Task::new("t1", "ocr");
        assert_eq!(task.id, "t1");
        assert_eq!(task.name, "t1");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.outputs.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new("b", "ui2code")
            .with_name("Build layout")
            .with_input("theme", json!("light"))
            .depends_on("a");

        assert_eq!(task.name, "Build layout");
        assert_eq!(task.inputs.get("theme"), Some(&json!("light")));
        assert_eq!(task.dependencies, vec!["a"]);
    }

    #[test]
    fn test_status_happy_path() {
        let mut task = Task::new("t", "ocr");
        task.start().unwrap();
        assert_eq!(task.status, TaskStatus::Running);

        let mut out = Params::new();
        out.insert("text".to_string(), json!("hello"));
        task.complete(out).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.outputs.unwrap().get("text"), Some(&json!("hello")));
    }

    #[test]
    fn test_status_failure_path() {
        let mut task = Task::new("t", "ocr");
        task.start().unwrap();
        task.fail("boom").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_never_reverts() {
        let mut task = Task::new("t", "ocr");
        assert!(task.complete(Params::new()).is_err());

        task.start().unwrap();
        assert!(task.start().is_err());

        task.fail("x").unwrap();
        let err = task.start().unwrap_err();
        assert_eq!(err.from, TaskStatus::Failed);
        assert_eq!(err.to, TaskStatus::Running);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_spec_deserializes_with_defaults() {
        let spec: TaskSpec = serde_json::from_value(json!({
            "id": "docs",
            "tool": "doc_gen"
        }))
        .unwrap();

        let task = Task::from(spec);
        assert_eq!(task.name, "docs");
        assert!(task.inputs.is_empty());
        assert!(task.dependencies.is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(TaskStatus::Completed).unwrap(), json!("completed"));
    }
}
