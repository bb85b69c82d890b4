//! Capability integration
//!
//! Capabilities are the opaque units of work tasks are bound to. This crate
//! holds the invocation contract, the injectable registry and the standard
//! catalog of tool descriptors.

#![warn(missing_docs)]

pub mod r#trait;
pub mod registry;
pub mod catalog;
pub mod builtin;

pub use r#trait::{require_input, Capability, CapabilityError};
pub use registry::CapabilityRegistry;
pub use catalog::{standard_catalog, DEFAULT_EXPECTED_DURATION_SECS};
pub use builtin::{EchoCapability, FnCapability};
