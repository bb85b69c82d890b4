//! Errors surfaced by planning and execution.

use taskweave_core::StatusError;
use thiserror::Error;

/// Structural and engine-level failures.
///
/// Task-level failures are never reported here; they are recorded on the task
/// and in the execution log.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan failed validation and must not run
    #[error("Plan is invalid: {}", .issues.join("; "))]
    InvalidPlan {
        /// Validator issues
        issues: Vec<String>,
    },

    /// A sequenced id names no task in the plan
    #[error("Task not found in plan: {0}")]
    TaskNotFound(String),

    /// Grouped dispatch found nothing ready to run
    #[error("No runnable task left; waiting on: {}", .0.join(", "))]
    Stalled(Vec<String>),

    /// Illegal task status transition
    #[error(transparent)]
    Status(#[from] StatusError),
}
