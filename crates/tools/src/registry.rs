//! Capability registry.
//!
//! The registry is constructed explicitly and passed to whoever needs it;
//! there is no process-wide table.

use std::collections::HashMap;
use std::sync::Arc;

use taskweave_core::{CapabilityInfo, Params, ResourceCost};

use crate::catalog::{standard_catalog, DEFAULT_EXPECTED_DURATION_SECS};
use crate::r#trait::{Capability, CapabilityError};

struct Entry {
    info: CapabilityInfo,
    handler: Option<Arc<dyn Capability>>,
}

/// Known tools: their descriptors and, optionally, a bound implementation.
pub struct CapabilityRegistry {
    entries: HashMap<String, Entry>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create a registry holding the standard catalog descriptors, unbound.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for info in standard_catalog() {
            registry.describe(info);
        }
        registry
    }

    /// Add or replace a descriptor. An existing binding is kept.
    pub fn describe(&mut self, info: CapabilityInfo) {
        match self.entries.get_mut(&info.name) {
            Some(entry) => entry.info = info,
            None => {
                self.order.push(info.name.clone());
                self.entries.insert(info.name.clone(), Entry { info, handler: None });
            }
        }
    }

    /// Add a descriptor together with its implementation.
    pub fn register(&mut self, info: CapabilityInfo, handler: Arc<dyn Capability>) {
        let name = info.name.clone();
        self.describe(info);
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.handler = Some(handler);
        }
    }

    /// Bind an implementation to an already described tool.
    pub fn bind(&mut self, name: &str, handler: Arc<dyn Capability>) -> Result<(), CapabilityError> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CapabilityError::UnknownTool(name.to_string()))?;
        entry.handler = Some(handler);
        Ok(())
    }

    /// Bind the same implementation to every described tool.
    pub fn bind_all(&mut self, handler: Arc<dyn Capability>) {
        for entry in self.entries.values_mut() {
            entry.handler = Some(handler.clone());
        }
    }

    /// Remove a tool entirely.
    pub fn unregister(&mut self, name: &str) -> Option<CapabilityInfo> {
        let entry = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(entry.info)
    }

    /// Whether the tool is known.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Descriptor of a tool.
    pub fn info(&self, name: &str) -> Option<&CapabilityInfo> {
        self.entries.get(name).map(|e| &e.info)
    }

    /// Resource cost of a tool; unknown tools cost nothing.
    pub fn resource_cost(&self, name: &str) -> ResourceCost {
        self.info(name).map(|i| i.resource_cost).unwrap_or_default()
    }

    /// Expected duration of a tool; unknown tools get the default.
    pub fn expected_duration(&self, name: &str) -> f64 {
        self.info(name)
            .map(|i| i.expected_duration_seconds)
            .unwrap_or(DEFAULT_EXPECTED_DURATION_SECS)
    }

    /// Resolve the implementation bound to a tool.
    pub fn capability(&self, name: &str) -> Result<Arc<dyn Capability>, CapabilityError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownTool(name.to_string()))?;
        entry
            .handler
            .clone()
            .ok_or_else(|| CapabilityError::NotBound(name.to_string()))
    }

    /// Resolve and invoke a tool by name.
    pub async fn invoke(&self, name: &str, inputs: &Params) -> Result<Params, anyhow::Error> {
        let capability = self.capability(name)?;
        tracing::debug!("Invoking capability: {}", name);
        capability.invoke(inputs).await
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<&CapabilityInfo> {
        self.order
            .iter()
            .filter_map(|n| self.entries.get(n).map(|e| &e.info))
            .collect()
    }

    /// Number of known tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tool is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("tools", &self.order)
            .finish()
    }
}
