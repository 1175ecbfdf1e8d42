//! ---
//! lab_section: "03-provisioning"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Capability traits implemented by backend engines."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fmt;

use async_trait::async_trait;
use indexmap::IndexMap;
use topolab_parser::{Link, Node};

use crate::error::Result;

/// Opaque backend identifier for a provisioned node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeHandle(String);

impl NodeHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque backend identifier for a provisioned link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkHandle(String);

impl LinkHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of provisioning one node: the backend handle, the resolved
/// port-label mapping, and the shells the node exposes.
#[derive(Debug, Clone)]
pub struct ProvisionedNode {
    pub handle: NodeHandle,
    /// Declared port label -> real backend port identifier. Must cover every
    /// port label declared on the node.
    pub ports: IndexMap<String, String>,
    pub default_shell: String,
    pub shells: Vec<String>,
}

/// A link endpoint after node provisioning: the owning node, its backend
/// handle, and the real (already resolved) port identifier.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub node: String,
    pub handle: NodeHandle,
    pub port: String,
}

/// Outcome of one shell command: raw output plus the channel's own
/// success marker (exit status, prompt pattern, whatever the backend
/// defines). The session layer never inspects output content to decide
/// success.
#[derive(Debug, Clone)]
pub struct ShellReply {
    pub output: String,
    pub success: bool,
}

impl ShellReply {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: true,
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            success: false,
        }
    }
}

/// One open communication channel to a node, bound to a single shell type.
/// Channels are exclusively owned by the session that wraps them.
#[async_trait]
pub trait ShellChannel: Send + fmt::Debug {
    /// Run one command to completion and return its reply. Serialization of
    /// concurrent commands is the caller's responsibility.
    async fn run(&mut self, command: &str) -> Result<ShellReply>;

    /// Release the channel. Further `run` calls must fail.
    async fn close(&mut self) -> Result<()>;
}

/// Backend capability consumed by the lifecycle manager. Implementations
/// must tolerate retried deprovision calls if they advertise idempotence;
/// the core itself never retries and propagates every failure.
#[async_trait]
pub trait ProvisioningEngine: Send + Sync {
    /// Realize a declared node, returning its handle and the real port
    /// identifier for every declared port label.
    async fn provision_node(&self, node: &Node) -> Result<ProvisionedNode>;

    /// Realize a declared link between two already-provisioned endpoints.
    async fn provision_link(
        &self,
        link: &Link,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> Result<LinkHandle>;

    async fn deprovision_node(&self, handle: &NodeHandle) -> Result<()>;

    async fn deprovision_link(&self, handle: &LinkHandle) -> Result<()>;

    /// Open a channel to a provisioned node using one of its shell types.
    async fn open_shell(&self, handle: &NodeHandle, shell_type: &str)
        -> Result<Box<dyn ShellChannel>>;
}
