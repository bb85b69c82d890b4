//! Taskweave core data models.
//!
//! This crate defines the data structures shared by the capability
//! registry, the planner and the execution engine.

#![warn(missing_docs)]

// Identities
mod id;

// Tasks and capabilities
mod task;
mod capability;

// Planning and execution artifacts
mod plan;
mod result;

// Re-exports
pub use id::RunId;

pub use task::{Params, StatusError, Task, TaskSpec, TaskStatus};
pub use capability::{CapabilityInfo, ResourceCost, ResourceLimits};
pub use plan::{DurationEstimate, Plan, Validation};
pub use result::{ExecutionResult, LogEntry, LogStatus};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
