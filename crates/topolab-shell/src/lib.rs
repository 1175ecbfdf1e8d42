//! ---
//! lab_section: "04-session"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Session layer module exports."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Command traffic to provisioned nodes.
//!
//! [`Session`] wraps one backend shell channel and serializes commands over
//! it, with optional per-command timeouts. On top of raw sends it tracks a
//! stack of named command contexts (configuration modes and the like) that
//! are guaranteed to be exited, and [`Library`] adds named commands with
//! silent-on-success or parsed-output policies.

pub mod context;
pub mod error;
pub mod library;
pub mod session;
#[cfg(test)]
mod support;

pub use context::{ContextSpec, ExitMode};
pub use error::{Result, SessionError};
pub use library::{CommandSpec, Library, LibraryCatalog, OutputParser, ResponsePolicy};
pub use session::{ChannelState, Session};
