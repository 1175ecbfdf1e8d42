//! ---
//! lab_section: "03-provisioning"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Provisioning error taxonomy."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures reported by a provisioning backend. The core never retries;
/// these propagate to the caller (triggering rollback during build).
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("failed to provision node '{node}': {reason}")]
    NodeProvisioning { node: String, reason: String },
    #[error("failed to provision link '{link}': {reason}")]
    LinkProvisioning { link: String, reason: String },
    #[error("failed to deprovision '{resource}': {reason}")]
    Deprovisioning { resource: String, reason: String },
    #[error("node '{node}' exposes no shell named '{shell}'")]
    UnknownShell { node: String, shell: String },
    #[error("unknown backend handle '{handle}'")]
    UnknownHandle { handle: String },
    #[error("shell channel to '{node}' is closed")]
    ChannelClosed { node: String },
}
