//! ---
//! lab_section: "02-topology-model"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Topology description parser module exports."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Parser for the Topolab topology description format.
//!
//! The format is line oriented: `#` starts a comment, a node is declared as
//! `[attr=value, ...] identifier`, and a link as
//! `node:port_label -- node:port_label` (optionally preceded by its own
//! attribute block). Link endpoints may reference nodes declared anywhere in
//! the file; resolution happens in a second pass once the full text has been
//! read.

pub mod attributes;
pub mod error;
pub mod parse;
pub mod topology;

pub use attributes::{AttributeSet, AttributeValue};
pub use error::{ParseError, ParseErrorKind, Result};
pub use parse::{parse_topology, parse_topology_with, ParserOptions};
pub use topology::{Endpoint, Link, Node, Topology};
