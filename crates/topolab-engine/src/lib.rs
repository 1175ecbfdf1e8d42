//! ---
//! lab_section: "03-provisioning"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Provisioning engine module exports."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Capability interfaces between the lifecycle manager and backend engines.
//!
//! A backend (container runtime, simulator, physical lab inventory)
//! implements [`ProvisioningEngine`] to realize nodes and links, and hands
//! out [`ShellChannel`]s for command traffic. The workspace ships
//! [`SimEngine`], a deterministic in-memory backend used by the test suites
//! and as the reference implementation of the contract.

pub mod error;
pub mod sim;
pub mod traits;

pub use error::{EngineError, Result};
pub use sim::SimEngine;
pub use traits::{
    LinkHandle, NodeHandle, ProvisionedNode, ProvisioningEngine, ResolvedEndpoint, ShellChannel,
    ShellReply,
};
