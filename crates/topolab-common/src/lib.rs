//! ---
//! lab_section: "01-shared-primitives"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Shared primitives and utilities for the harness runtime."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! Shared primitives for the Topolab workspace.
//! This crate exposes configuration loading and logging utilities consumed
//! across the workspace.

pub mod config;
pub mod logging;

pub use config::{EngineConfig, HarnessConfig, LoggingConfig, SessionConfig};
pub use logging::{init, init_tracing, LogFormat};
