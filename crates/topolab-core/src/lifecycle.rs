//! ---
//! lab_section: "05-lifecycle"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Live topology build, access and teardown."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Lifecycle management of a declared topology against one backend.
//!
//! [`LiveTopology::build`] provisions nodes in declaration order, then
//! links, and rolls everything back in reverse on the first failure so a
//! failed build never leaks backend resources. Teardown is idempotent and
//! aggregating: it attempts every remaining resource, collects failures
//! into a [`TeardownReport`], and a later call retries only what is still
//! unreleased.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use topolab_engine::{
    EngineError, LinkHandle, NodeHandle, ProvisioningEngine, ResolvedEndpoint,
};
use topolab_parser::Topology;
use topolab_shell::Session;
use tracing::{debug, info, warn};

use crate::error::{BuildError, NotFoundError, TeardownFailure, TeardownReport};

/// A provisioned node: its backend handle, the resolved port map, and the
/// shells it exposes. Holds the engine so sessions can be opened directly.
pub struct LiveNode {
    engine: Arc<dyn ProvisioningEngine>,
    pub identifier: String,
    pub node_type: String,
    pub handle: NodeHandle,
    /// Declared port label -> real backend port identifier.
    pub ports: IndexMap<String, String>,
    pub default_shell: String,
    pub shells: Vec<String>,
    released: bool,
}

impl LiveNode {
    /// Real port identifier for a declared label.
    pub fn port(&self, label: &str) -> Option<&str> {
        self.ports.get(label).map(String::as_str)
    }

    /// Open a session on the node's default shell.
    pub async fn open_session(&self) -> Result<Session, EngineError> {
        self.open_session_on(&self.default_shell.clone()).await
    }

    /// Open a session on a specific shell type.
    pub async fn open_session_on(&self, shell_type: &str) -> Result<Session, EngineError> {
        let channel = self.engine.open_shell(&self.handle, shell_type).await?;
        Ok(Session::new(
            self.identifier.clone(),
            shell_type,
            channel,
        ))
    }
}

impl fmt::Debug for LiveNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveNode")
            .field("identifier", &self.identifier)
            .field("node_type", &self.node_type)
            .field("handle", &self.handle)
            .field("ports", &self.ports)
            .field("default_shell", &self.default_shell)
            .field("shells", &self.shells)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct LiveLink {
    label: String,
    handle: LinkHandle,
    released: bool,
}

/// A built topology. Dropping it does not release backend resources; call
/// [`LiveTopology::teardown`].
pub struct LiveTopology {
    engine: Arc<dyn ProvisioningEngine>,
    nodes: IndexMap<String, LiveNode>,
    links: Vec<LiveLink>,
    torn_down: bool,
}

impl fmt::Debug for LiveTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveTopology")
            .field("nodes", &self.nodes)
            .field("links", &self.links)
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

impl LiveTopology {
    /// Provision every declared node and link. On failure the partial build
    /// is rolled back in reverse provisioning order before the error
    /// returns; rollback failures are logged and do not mask it.
    pub async fn build(
        topology: &Topology,
        engine: Arc<dyn ProvisioningEngine>,
    ) -> Result<Self, BuildError> {
        topology.validate()?;
        info!(%topology, "building topology");

        let mut nodes: IndexMap<String, LiveNode> = IndexMap::new();
        let mut links: Vec<LiveLink> = Vec::new();

        for node in topology.nodes.values() {
            let provisioned = match engine.provision_node(node).await {
                Ok(provisioned) => provisioned,
                Err(source) => {
                    rollback(engine.as_ref(), &links, &nodes).await;
                    return Err(BuildError::Node {
                        node: node.identifier.clone(),
                        source,
                    });
                }
            };
            let live = LiveNode {
                engine: engine.clone(),
                identifier: node.identifier.clone(),
                // validate() guarantees the attribute is present and textual
                node_type: node.node_type().unwrap_or_default().to_owned(),
                handle: provisioned.handle,
                ports: provisioned.ports,
                default_shell: provisioned.default_shell,
                shells: provisioned.shells,
                released: false,
            };
            debug!(node = %live.identifier, handle = %live.handle, "node provisioned");
            nodes.insert(live.identifier.clone(), live);

            let live = &nodes[&node.identifier];
            for label in &node.ports {
                if !live.ports.contains_key(label) {
                    let err = BuildError::UnresolvedPort {
                        node: node.identifier.clone(),
                        port: label.clone(),
                    };
                    rollback(engine.as_ref(), &links, &nodes).await;
                    return Err(err);
                }
            }
        }

        for link in &topology.links {
            let endpoints = match resolve_endpoints(link, &nodes) {
                Ok(endpoints) => endpoints,
                Err(err) => {
                    rollback(engine.as_ref(), &links, &nodes).await;
                    return Err(err);
                }
            };
            match engine.provision_link(link, &endpoints).await {
                Ok(handle) => {
                    debug!(link = %link.label(), %handle, "link provisioned");
                    links.push(LiveLink {
                        label: link.label(),
                        handle,
                        released: false,
                    });
                }
                Err(source) => {
                    rollback(engine.as_ref(), &links, &nodes).await;
                    return Err(BuildError::Link {
                        link: link.label(),
                        source,
                    });
                }
            }
        }

        info!(
            nodes = nodes.len(),
            links = links.len(),
            "topology built"
        );
        Ok(Self {
            engine,
            nodes,
            links,
            torn_down: false,
        })
    }

    /// Access a node by its declared identifier.
    pub fn get(&self, identifier: &str) -> Result<&LiveNode, NotFoundError> {
        self.nodes
            .get(identifier)
            .ok_or_else(|| NotFoundError(identifier.to_owned()))
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &LiveNode> {
        self.nodes.values()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Release every remaining resource, links before nodes, each in
    /// reverse provisioning order. Failures are collected rather than
    /// short-circuiting; resources already released are never touched
    /// again, so retrying after a partial failure is safe.
    pub async fn teardown(&mut self) -> Result<(), TeardownReport> {
        if self.torn_down {
            return Ok(());
        }
        let mut report = TeardownReport::default();

        for link in self.links.iter_mut().rev() {
            if link.released {
                continue;
            }
            match self.engine.deprovision_link(&link.handle).await {
                Ok(()) => link.released = true,
                Err(error) => {
                    warn!(link = %link.label, %error, "link deprovisioning failed");
                    report.failures.push(TeardownFailure {
                        resource: link.label.clone(),
                        error,
                    });
                }
            }
        }

        for node in self.nodes.values_mut().rev() {
            if node.released {
                continue;
            }
            match self.engine.deprovision_node(&node.handle).await {
                Ok(()) => node.released = true,
                Err(error) => {
                    warn!(node = %node.identifier, %error, "node deprovisioning failed");
                    report.failures.push(TeardownFailure {
                        resource: node.identifier.clone(),
                        error,
                    });
                }
            }
        }

        if report.is_clean() {
            self.torn_down = true;
            info!("topology torn down");
            Ok(())
        } else {
            Err(report)
        }
    }
}

fn resolve_endpoints(
    link: &topolab_parser::Link,
    nodes: &IndexMap<String, LiveNode>,
) -> Result<[ResolvedEndpoint; 2], BuildError> {
    let resolve = |endpoint: &topolab_parser::Endpoint| -> Result<ResolvedEndpoint, BuildError> {
        // validate() guarantees the node exists
        let node = &nodes[&endpoint.node];
        let port = node
            .port(&endpoint.port)
            .ok_or_else(|| BuildError::UnresolvedPort {
                node: endpoint.node.clone(),
                port: endpoint.port.clone(),
            })?;
        Ok(ResolvedEndpoint {
            node: endpoint.node.clone(),
            handle: node.handle.clone(),
            port: port.to_owned(),
        })
    };
    Ok([resolve(&link.endpoints[0])?, resolve(&link.endpoints[1])?])
}

async fn rollback(
    engine: &dyn ProvisioningEngine,
    links: &[LiveLink],
    nodes: &IndexMap<String, LiveNode>,
) {
    warn!("build failed, rolling back partial topology");
    for link in links.iter().rev() {
        if let Err(error) = engine.deprovision_link(&link.handle).await {
            warn!(link = %link.label, %error, "rollback of link failed");
        }
    }
    for node in nodes.values().rev() {
        if let Err(error) = engine.deprovision_node(&node.handle).await {
            warn!(node = %node.identifier, %error, "rollback of node failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topolab_engine::SimEngine;
    use topolab_parser::parse_topology;

    const SAMPLE: &str = "\
        [type=openswitch, shell=vtysh] ops1\n\
        [type=host] hs1\n\
        [type=host] hs2\n\
        hs1:port1 -- ops1:port6\n\
        ops1:port3 -- hs2:port1\n";

    #[tokio::test]
    async fn build_resolves_ports_and_exposes_nodes() {
        let engine = Arc::new(SimEngine::new());
        let topology = parse_topology(SAMPLE).unwrap();
        let live = LiveTopology::build(&topology, engine.clone()).await.unwrap();

        let ops1 = live.get("ops1").unwrap();
        assert_eq!(ops1.node_type, "openswitch");
        assert_eq!(ops1.port("port6"), Some("if01"));
        assert_eq!(ops1.port("port3"), Some("if02"));
        assert_eq!(ops1.default_shell, "vtysh");

        assert!(live.get("ghost").is_err());
        assert_eq!(engine.provisioned_nodes(), 3);
        assert_eq!(engine.provisioned_links(), 2);
    }

    #[tokio::test]
    async fn failed_build_rolls_back_everything() {
        let engine = Arc::new(SimEngine::new());
        engine.fail_node_provisioning("hs2");
        let topology = parse_topology(SAMPLE).unwrap();

        let err = LiveTopology::build(&topology, engine.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::Node { ref node, .. } if node == "hs2"));
        assert_eq!(engine.provisioned_nodes(), 0);
        assert_eq!(engine.provisioned_links(), 0);
    }

    #[tokio::test]
    async fn teardown_is_idempotent() {
        let engine = Arc::new(SimEngine::new());
        let topology = parse_topology(SAMPLE).unwrap();
        let mut live = LiveTopology::build(&topology, engine.clone()).await.unwrap();

        live.teardown().await.unwrap();
        assert!(live.is_torn_down());
        assert_eq!(engine.provisioned_nodes(), 0);
        let calls = engine.deprovision_calls();

        live.teardown().await.unwrap();
        assert_eq!(engine.deprovision_calls(), calls);
    }

    #[tokio::test]
    async fn teardown_aggregates_failures_and_retries_only_them() {
        let engine = Arc::new(SimEngine::new());
        engine.fail_node_deprovisioning("ops1");
        let topology = parse_topology(SAMPLE).unwrap();
        let mut live = LiveTopology::build(&topology, engine.clone()).await.unwrap();

        let report = live.teardown().await.unwrap_err();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].resource, "ops1");
        assert!(!live.is_torn_down());
        // Everything except the failing node is already gone.
        assert_eq!(engine.provisioned_nodes(), 1);
        assert_eq!(engine.provisioned_links(), 0);

        engine.clear_faults();
        let calls = engine.deprovision_calls();
        live.teardown().await.unwrap();
        assert!(live.is_torn_down());
        assert_eq!(engine.deprovision_calls(), calls + 1);
    }

    #[tokio::test]
    async fn sessions_open_on_declared_shells_only() {
        let engine = Arc::new(SimEngine::new());
        let topology = parse_topology(SAMPLE).unwrap();
        let live = LiveTopology::build(&topology, engine).await.unwrap();

        let ops1 = live.get("ops1").unwrap();
        let session = ops1.open_session().await.unwrap();
        assert_eq!(session.shell_type(), "vtysh");
        assert!(ops1.open_session_on("bash").await.is_ok());

        let hs1 = live.get("hs1").unwrap();
        assert!(matches!(
            hs1.open_session_on("vtysh").await.unwrap_err(),
            EngineError::UnknownShell { .. }
        ));
    }
}
