//! ---
//! lab_section: "02-topology-model"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "In-memory topology graph model."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::attributes::AttributeSet;
use crate::error::ParseErrorKind;

/// A single declared device in the topology.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    pub identifier: String,
    pub attributes: AttributeSet,
    /// Port labels referenced by links, in first-reference order. Labels are
    /// provisional names; the provisioning engine maps them to real port
    /// identifiers at build time.
    pub ports: Vec<String>,
}

impl Node {
    pub fn new(identifier: impl Into<String>, attributes: AttributeSet) -> Self {
        Self {
            identifier: identifier.into(),
            attributes,
            ports: Vec::new(),
        }
    }

    /// The declared `type` attribute, when present and textual.
    pub fn node_type(&self) -> Option<&str> {
        self.attributes.get("type").and_then(|value| value.as_str())
    }

    /// Record a port label. Returns `false` when the label was already
    /// declared on this node.
    pub fn declare_port(&mut self, label: &str) -> bool {
        if self.ports.iter().any(|p| p == label) {
            return false;
        }
        self.ports.push(label.to_owned());
        true
    }
}

/// One side of a link: a node identifier and a port label on that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub node: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.port)
    }
}

/// A connection between two node ports. Endpoints are unordered: a link
/// `a:p1 -- b:p2` equals `b:p2 -- a:p1`.
#[derive(Debug, Clone, Serialize)]
pub struct Link {
    pub endpoints: [Endpoint; 2],
    pub attributes: AttributeSet,
}

impl Link {
    pub fn new(a: Endpoint, b: Endpoint, attributes: AttributeSet) -> Self {
        Self {
            endpoints: [a, b],
            attributes,
        }
    }

    /// Stable display name, used in diagnostics.
    pub fn label(&self) -> String {
        format!("{} -- {}", self.endpoints[0], self.endpoints[1])
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        let same = self.endpoints == other.endpoints;
        let flipped = self.endpoints[0] == other.endpoints[1]
            && self.endpoints[1] == other.endpoints[0];
        (same || flipped) && self.attributes == other.attributes
    }
}

/// The full declared graph. Node iteration order is declaration order, which
/// the lifecycle manager relies on for deterministic provisioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    pub nodes: IndexMap<String, Node>,
    pub links: Vec<Link>,
}

impl Topology {
    pub fn node(&self, identifier: &str) -> Option<&Node> {
        self.nodes.get(identifier)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Re-check the structural invariants the parser guarantees. Useful for
    /// topologies assembled programmatically rather than parsed.
    pub fn validate(&self) -> std::result::Result<(), ParseErrorKind> {
        for (identifier, node) in &self.nodes {
            if node.node_type().is_none() {
                return Err(ParseErrorKind::MissingType(identifier.clone()));
            }
        }
        let mut seen_ports: Vec<(&str, &str)> = Vec::new();
        for link in &self.links {
            for endpoint in &link.endpoints {
                if !self.nodes.contains_key(&endpoint.node) {
                    return Err(ParseErrorKind::UnknownNode(endpoint.node.clone()));
                }
                let key = (endpoint.node.as_str(), endpoint.port.as_str());
                if seen_ports.contains(&key) {
                    return Err(ParseErrorKind::DuplicatePort {
                        node: endpoint.node.clone(),
                        port: endpoint.port.clone(),
                    });
                }
                seen_ports.push(key);
            }
        }
        Ok(())
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} node(s), {} link(s)",
            self.node_count(),
            self.link_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;

    fn host(identifier: &str) -> Node {
        let mut attributes = AttributeSet::new();
        attributes.insert("type".into(), AttributeValue::Token("host".into()));
        Node::new(identifier, attributes)
    }

    #[test]
    fn links_compare_unordered() {
        let a = Link::new(
            Endpoint::new("hs1", "port1"),
            Endpoint::new("ops1", "port6"),
            AttributeSet::new(),
        );
        let b = Link::new(
            Endpoint::new("ops1", "port6"),
            Endpoint::new("hs1", "port1"),
            AttributeSet::new(),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn validate_rejects_unknown_endpoint() {
        let mut topology = Topology::default();
        topology.nodes.insert("hs1".into(), host("hs1"));
        topology.links.push(Link::new(
            Endpoint::new("hs1", "port1"),
            Endpoint::new("ghost", "port2"),
            AttributeSet::new(),
        ));
        assert_eq!(
            topology.validate(),
            Err(ParseErrorKind::UnknownNode("ghost".into()))
        );
    }

    #[test]
    fn validate_rejects_untyped_node() {
        let mut topology = Topology::default();
        topology
            .nodes
            .insert("hs1".into(), Node::new("hs1", AttributeSet::new()));
        assert_eq!(
            topology.validate(),
            Err(ParseErrorKind::MissingType("hs1".into()))
        );
    }

    #[test]
    fn validate_rejects_reused_port() {
        let mut topology = Topology::default();
        topology.nodes.insert("hs1".into(), host("hs1"));
        topology.nodes.insert("hs2".into(), host("hs2"));
        topology.nodes.insert("hs3".into(), host("hs3"));
        topology.links.push(Link::new(
            Endpoint::new("hs1", "port1"),
            Endpoint::new("hs2", "port1"),
            AttributeSet::new(),
        ));
        topology.links.push(Link::new(
            Endpoint::new("hs1", "port1"),
            Endpoint::new("hs3", "port1"),
            AttributeSet::new(),
        ));
        assert!(matches!(
            topology.validate(),
            Err(ParseErrorKind::DuplicatePort { .. })
        ));
    }
}
