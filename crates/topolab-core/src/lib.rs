//! ---
//! lab_section: "05-lifecycle"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Lifecycle manager module exports."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Topology lifecycle: build a declared graph through a provisioning
//! engine, hand out live nodes and sessions, and tear everything down.

pub mod error;
pub mod lifecycle;

pub use error::{BuildError, NotFoundError, TeardownFailure, TeardownReport};
pub use lifecycle::{LiveNode, LiveTopology};
