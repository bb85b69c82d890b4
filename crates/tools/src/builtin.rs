//! Built-in generic capabilities.

use async_trait::async_trait;
use taskweave_core::Params;

use crate::r#trait::Capability;

/// Returns its effective inputs unchanged. Used for dry runs.
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    async fn invoke(&self, inputs: &Params) -> Result<Params, anyhow::Error> {
        Ok(inputs.clone())
    }
}

/// Adapts a synchronous closure into a capability.
pub struct FnCapability<F> {
    func: F,
}

impl<F> FnCapability<F>
where
    F: Fn(&Params) -> Result<Params, anyhow::Error> + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> Capability for FnCapability<F>
where
    F: Fn(&Params) -> Result<Params, anyhow::Error> + Send + Sync,
{
    async fn invoke(&self, inputs: &Params) -> Result<Params, anyhow::Error> {
        (self.func)(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r#trait::require_input;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_inputs() {
        let mut inputs = Params::new();
        inputs.insert("k".to_string(), json!([1, 2]));
        let out = EchoCapability.invoke(&inputs).await.unwrap();
        assert_eq!(out, inputs);
    }

    #[tokio::test]
    async fn test_fn_capability_propagates_errors() {
        let cap = FnCapability::new(|inputs: &Params| {
            require_input(inputs, "code_path")?;
            Ok(Params::new())
        });

        let err = cap.invoke(&Params::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required input: code_path");
    }
}
