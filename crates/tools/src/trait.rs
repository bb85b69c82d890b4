//! Capability abstraction.

use async_trait::async_trait;
use taskweave_core::Params;
use thiserror::Error;

/// A unit of execution a task can be bound to.
///
/// The engine never inspects a capability beyond this call. Any error
/// returned here is recorded against the task and never propagated.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Run the capability against the task's effective inputs.
    async fn invoke(&self, inputs: &Params) -> Result<Params, anyhow::Error>;
}

/// Errors raised by the registry or by capabilities themselves.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Tool is not in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Tool is described but has no implementation
    #[error("No capability bound for tool: {0}")]
    NotBound(String),

    /// An expected input key is absent
    #[error("Missing required input: {0}")]
    MissingInput(String),
}

/// Fetch a required input, failing when an upstream task did not provide it.
pub fn require_input<'a>(
    inputs: &'a Params,
    key: &str,
) -> Result<&'a serde_json::Value, CapabilityError> {
    inputs
        .get(key)
        .ok_or_else(|| CapabilityError::MissingInput(key.to_string()))
}
