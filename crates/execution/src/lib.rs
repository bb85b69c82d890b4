//! Execution layer - plan building, validation, scoring and task dispatch.
//!
//! ```text
//! Vec<Task>
//!   -> DependencyGraph::build()        adjacency + in-degree
//!   -> DependencyGraph::topological_sort()
//!   -> ParallelGrouper::group()        resource-bounded groups
//!   -> PlanValidator::validate()
//!   -> PlanScorer::score()
//!   -> ExecutionEngine::execute()      ExecutionResult
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod dependency;
pub mod scheduler;
pub mod validator;
pub mod scorer;
pub mod planner;
pub mod engine;

pub use error::PlanError;
pub use dependency::{DanglingDependency, DependencyGraph, TopologicalOrder};
pub use scheduler::{Grouping, ParallelGrouper};
pub use validator::PlanValidator;
pub use scorer::PlanScorer;
pub use planner::Planner;
pub use engine::{DispatchMode, EngineConfig, ExecutionEngine};
