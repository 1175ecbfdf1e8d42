//! ---
//! lab_section: "05-lifecycle"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Lifecycle error taxonomy and the teardown report."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fmt;

use thiserror::Error;
use topolab_engine::EngineError;
use topolab_parser::ParseErrorKind;

/// Lookup of a node identifier the topology does not declare.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("topology has no node '{0}'")]
pub struct NotFoundError(pub String);

/// A failed build. Resources provisioned before the failure have already
/// been rolled back when this surfaces.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid topology: {0}")]
    Invalid(#[from] ParseErrorKind),
    #[error("provisioning node '{node}' failed")]
    Node {
        node: String,
        #[source]
        source: EngineError,
    },
    #[error("provisioning link '{link}' failed")]
    Link {
        link: String,
        #[source]
        source: EngineError,
    },
    #[error("engine resolved no port for label '{port}' on node '{node}'")]
    UnresolvedPort { node: String, port: String },
}

/// One resource the teardown pass could not release.
#[derive(Debug)]
pub struct TeardownFailure {
    pub resource: String,
    pub error: EngineError,
}

/// Everything that failed during one teardown pass. Released resources are
/// never retried; calling teardown again retries only the failures listed
/// here.
#[derive(Debug, Default)]
pub struct TeardownReport {
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for TeardownReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "teardown left {} resource(s) behind", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}: {}", failure.resource, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for TeardownReport {}
