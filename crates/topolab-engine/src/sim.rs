//! ---
//! lab_section: "03-provisioning"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Deterministic in-memory simulation backend."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use regex::Regex;
use topolab_parser::{Link, Node};
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::traits::{
    LinkHandle, NodeHandle, ProvisionedNode, ProvisioningEngine, ResolvedEndpoint, ShellChannel,
    ShellReply,
};

/// In-memory backend with deterministic port assignment and a resource
/// ledger, used by the integration suites and as the reference
/// implementation of the engine contract.
///
/// Port labels resolve to `if01`, `if02`, … in label declaration order.
/// Shells reply with empty successful output unless a responder has been
/// scripted for the node. Fault injection hooks simulate backend failures
/// for rollback and teardown tests.
#[derive(Debug, Default, Clone)]
pub struct SimEngine {
    state: Arc<Mutex<SimState>>,
}

#[derive(Debug, Default)]
struct SimState {
    nodes: IndexMap<String, SimNode>,
    links: IndexMap<String, SimLink>,
    scripts: Vec<Script>,
    transcripts: IndexMap<String, Vec<(String, String)>>,
    provision_calls: u64,
    deprovision_calls: u64,
    next_link: u64,
    fail_provision: Vec<String>,
    fail_deprovision: Vec<String>,
}

#[derive(Debug)]
struct SimNode {
    identifier: String,
    shells: Vec<String>,
    released: bool,
}

#[derive(Debug)]
struct SimLink {
    label: String,
    released: bool,
}

#[derive(Debug)]
struct Script {
    node: String,
    pattern: Regex,
    output: String,
    success: bool,
    delay: Option<Duration>,
}

impl SimEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a responder: commands on `node` matching `pattern` reply with
    /// `output` and a success marker. Later scripts shadow earlier ones.
    pub fn script(
        &self,
        node: &str,
        pattern: &str,
        output: &str,
    ) -> std::result::Result<(), regex::Error> {
        self.push_script(node, pattern, output, true, None)
    }

    /// Script a responder whose reply carries a failure marker.
    pub fn script_failure(
        &self,
        node: &str,
        pattern: &str,
        output: &str,
    ) -> std::result::Result<(), regex::Error> {
        self.push_script(node, pattern, output, false, None)
    }

    /// Script a responder that completes only after `delay`. Used to
    /// exercise session timeouts.
    pub fn script_slow(
        &self,
        node: &str,
        pattern: &str,
        output: &str,
        delay: Duration,
    ) -> std::result::Result<(), regex::Error> {
        self.push_script(node, pattern, output, true, Some(delay))
    }

    fn push_script(
        &self,
        node: &str,
        pattern: &str,
        output: &str,
        success: bool,
        delay: Option<Duration>,
    ) -> std::result::Result<(), regex::Error> {
        let pattern = Regex::new(pattern)?;
        self.state.lock().scripts.push(Script {
            node: node.to_owned(),
            pattern,
            output: output.to_owned(),
            success,
            delay,
        });
        Ok(())
    }

    /// Make the next provisioning of `identifier` fail.
    pub fn fail_node_provisioning(&self, identifier: &str) {
        self.state.lock().fail_provision.push(identifier.to_owned());
    }

    /// Make deprovisioning of `identifier` fail until faults are cleared.
    pub fn fail_node_deprovisioning(&self, identifier: &str) {
        self.state
            .lock()
            .fail_deprovision
            .push(identifier.to_owned());
    }

    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.fail_provision.clear();
        state.fail_deprovision.clear();
    }

    /// Nodes currently provisioned and not yet released.
    pub fn provisioned_nodes(&self) -> usize {
        self.state
            .lock()
            .nodes
            .values()
            .filter(|n| !n.released)
            .count()
    }

    /// Links currently provisioned and not yet released.
    pub fn provisioned_links(&self) -> usize {
        self.state
            .lock()
            .links
            .values()
            .filter(|l| !l.released)
            .count()
    }

    /// Successful provision calls (nodes and links).
    pub fn provision_calls(&self) -> u64 {
        self.state.lock().provision_calls
    }

    /// Successful deprovision calls (nodes and links).
    pub fn deprovision_calls(&self) -> u64 {
        self.state.lock().deprovision_calls
    }

    /// Commands a node has received, as `(shell_type, command)` pairs in
    /// arrival order.
    pub fn transcript(&self, node: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .transcripts
            .get(node)
            .cloned()
            .unwrap_or_default()
    }
}

fn handle_id(identifier: &str) -> String {
    format!("sim-{}", identifier)
}

#[async_trait]
impl ProvisioningEngine for SimEngine {
    async fn provision_node(&self, node: &Node) -> Result<ProvisionedNode> {
        let mut state = self.state.lock();
        if state.fail_provision.iter().any(|n| n == &node.identifier) {
            return Err(EngineError::NodeProvisioning {
                node: node.identifier.clone(),
                reason: "injected provisioning fault".to_owned(),
            });
        }
        let id = handle_id(&node.identifier);
        if state.nodes.get(&id).is_some_and(|n| !n.released) {
            return Err(EngineError::NodeProvisioning {
                node: node.identifier.clone(),
                reason: "node is already provisioned".to_owned(),
            });
        }

        let ports: IndexMap<String, String> = node
            .ports
            .iter()
            .enumerate()
            .map(|(idx, label)| (label.clone(), format!("if{:02}", idx + 1)))
            .collect();

        // Shell exposure is node-type dependent in real backends; here it is
        // driven by the freeform `shell` attribute, defaulting to bash.
        let default_shell = node
            .attributes
            .get("shell")
            .and_then(|value| value.as_str())
            .unwrap_or("bash")
            .to_owned();
        let mut shells = vec![default_shell.clone()];
        if default_shell != "bash" {
            shells.push("bash".to_owned());
        }

        state.nodes.insert(
            id.clone(),
            SimNode {
                identifier: node.identifier.clone(),
                shells: shells.clone(),
                released: false,
            },
        );
        state.provision_calls += 1;
        debug!(node = %node.identifier, handle = %id, "sim node provisioned");

        Ok(ProvisionedNode {
            handle: NodeHandle::new(id),
            ports,
            default_shell,
            shells,
        })
    }

    async fn provision_link(
        &self,
        link: &Link,
        endpoints: &[ResolvedEndpoint; 2],
    ) -> Result<LinkHandle> {
        let mut state = self.state.lock();
        for endpoint in endpoints {
            let known = state
                .nodes
                .get(endpoint.handle.id())
                .is_some_and(|n| !n.released);
            if !known {
                return Err(EngineError::LinkProvisioning {
                    link: link.label(),
                    reason: format!("endpoint node '{}' is not provisioned", endpoint.node),
                });
            }
        }
        state.next_link += 1;
        let id = format!("lnk-{:02}", state.next_link);
        state.links.insert(
            id.clone(),
            SimLink {
                label: link.label(),
                released: false,
            },
        );
        state.provision_calls += 1;
        debug!(link = %link.label(), handle = %id, "sim link provisioned");
        Ok(LinkHandle::new(id))
    }

    async fn deprovision_node(&self, handle: &NodeHandle) -> Result<()> {
        let mut state = self.state.lock();
        let node = state
            .nodes
            .get_mut(handle.id())
            .ok_or_else(|| EngineError::UnknownHandle {
                handle: handle.id().to_owned(),
            })?;
        if node.released {
            return Err(EngineError::Deprovisioning {
                resource: node.identifier.clone(),
                reason: "node already released".to_owned(),
            });
        }
        let identifier = node.identifier.clone();
        if state.fail_deprovision.iter().any(|n| n == &identifier) {
            return Err(EngineError::Deprovisioning {
                resource: identifier,
                reason: "injected deprovisioning fault".to_owned(),
            });
        }
        if let Some(node) = state.nodes.get_mut(handle.id()) {
            node.released = true;
        }
        state.deprovision_calls += 1;
        debug!(node = %identifier, "sim node deprovisioned");
        Ok(())
    }

    async fn deprovision_link(&self, handle: &LinkHandle) -> Result<()> {
        let mut state = self.state.lock();
        let link = state
            .links
            .get_mut(handle.id())
            .ok_or_else(|| EngineError::UnknownHandle {
                handle: handle.id().to_owned(),
            })?;
        if link.released {
            return Err(EngineError::Deprovisioning {
                resource: link.label.clone(),
                reason: "link already released".to_owned(),
            });
        }
        link.released = true;
        let label = link.label.clone();
        state.deprovision_calls += 1;
        debug!(link = %label, "sim link deprovisioned");
        Ok(())
    }

    async fn open_shell(
        &self,
        handle: &NodeHandle,
        shell_type: &str,
    ) -> Result<Box<dyn ShellChannel>> {
        let state = self.state.lock();
        let node = state
            .nodes
            .get(handle.id())
            .filter(|n| !n.released)
            .ok_or_else(|| EngineError::UnknownHandle {
                handle: handle.id().to_owned(),
            })?;
        if !node.shells.iter().any(|s| s == shell_type) {
            return Err(EngineError::UnknownShell {
                node: node.identifier.clone(),
                shell: shell_type.to_owned(),
            });
        }
        Ok(Box::new(SimShell {
            state: self.state.clone(),
            node: node.identifier.clone(),
            shell: shell_type.to_owned(),
            closed: false,
        }))
    }
}

#[derive(Debug)]
struct SimShell {
    state: Arc<Mutex<SimState>>,
    node: String,
    shell: String,
    closed: bool,
}

#[async_trait]
impl ShellChannel for SimShell {
    async fn run(&mut self, command: &str) -> Result<ShellReply> {
        if self.closed {
            return Err(EngineError::ChannelClosed {
                node: self.node.clone(),
            });
        }
        let (reply, delay) = {
            let mut state = self.state.lock();
            state
                .transcripts
                .entry(self.node.clone())
                .or_default()
                .push((self.shell.clone(), command.to_owned()));
            // Later scripts shadow earlier ones.
            match state
                .scripts
                .iter()
                .rev()
                .find(|s| s.node == self.node && s.pattern.is_match(command))
            {
                Some(script) => (
                    ShellReply {
                        output: script.output.clone(),
                        success: script.success,
                    },
                    script.delay,
                ),
                None => (ShellReply::ok(""), None),
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
