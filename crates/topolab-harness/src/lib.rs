//! ---
//! lab_section: "06-harness"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Suite-facing harness over parser, engine and lifecycle."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
//! The surface test suites program against.
//!
//! A suite hands a topology description and an engine to
//! [`SuiteTopology::build`], gets live nodes and sessions back with the
//! configured defaults applied, and calls [`SuiteTopology::teardown`] when
//! done. [`step`] marks suite phases in the log stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use topolab_common::config::{EngineConfig, HarnessConfig};
use topolab_core::{LiveNode, LiveTopology};
use topolab_engine::{ProvisioningEngine, SimEngine};
use topolab_parser::{parse_topology_with, ParserOptions};
use topolab_shell::{Library, LibraryCatalog, Session};
use tracing::info;

/// Per-suite defaults, usually derived from the harness configuration.
#[derive(Debug, Clone, Default)]
pub struct SuiteOptions {
    pub default_node_type: Option<String>,
    pub session_timeout: Option<std::time::Duration>,
    /// Command libraries resolvable by node type and shell type once the
    /// topology is built.
    pub libraries: LibraryCatalog,
}

impl SuiteOptions {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            default_node_type: config.default_node_type.clone(),
            session_timeout: config.session.command_timeout(),
            libraries: LibraryCatalog::new(),
        }
    }

    pub fn with_libraries(mut self, libraries: LibraryCatalog) -> Self {
        self.libraries = libraries;
        self
    }
}

/// Instantiate the configured backend engine. Only the built-in simulation
/// backend is known here; deployments with real backends register them by
/// constructing the engine themselves and skipping this helper.
pub fn engine_from_config(config: &EngineConfig) -> Result<Arc<dyn ProvisioningEngine>> {
    match config.kind.as_str() {
        "sim" => Ok(Arc::new(SimEngine::new())),
        other => bail!("unknown engine kind '{other}'"),
    }
}

/// Initialize structured logging for a suite run. Emits JSON to stdout and
/// a rolling daily file per the logging configuration.
pub fn init_suite_logging(config: &HarnessConfig) -> Result<()> {
    topolab_common::logging::init_tracing("topolab-harness", &config.logging)
}

/// A built topology plus the session defaults the suite runs with.
#[derive(Debug)]
pub struct SuiteTopology {
    live: LiveTopology,
    session_timeout: Option<std::time::Duration>,
    libraries: LibraryCatalog,
}

impl SuiteTopology {
    /// Parse `description` and provision it on `engine`.
    pub async fn build(
        description: &str,
        engine: Arc<dyn ProvisioningEngine>,
        options: SuiteOptions,
    ) -> Result<Self> {
        let parser_options = ParserOptions {
            default_node_type: options.default_node_type,
        };
        let topology = parse_topology_with(description, &parser_options)
            .context("parsing topology description")?;
        let live = LiveTopology::build(&topology, engine)
            .await
            .context("building topology")?;
        Ok(Self {
            live,
            session_timeout: options.session_timeout,
            libraries: options.libraries,
        })
    }

    pub fn get(&self, identifier: &str) -> Result<&LiveNode> {
        Ok(self.live.get(identifier)?)
    }

    /// Open a session on a node's default shell, with the configured
    /// command timeout applied.
    pub async fn session(&self, identifier: &str) -> Result<Session> {
        let node = self.get(identifier)?;
        let session = node
            .open_session()
            .await
            .with_context(|| format!("opening session on '{identifier}'"))?;
        Ok(session.with_timeout(self.session_timeout))
    }

    /// Open a session on a specific shell type.
    pub async fn session_on(&self, identifier: &str, shell_type: &str) -> Result<Session> {
        let node = self.get(identifier)?;
        let session = node
            .open_session_on(shell_type)
            .await
            .with_context(|| format!("opening {shell_type} session on '{identifier}'"))?;
        Ok(session.with_timeout(self.session_timeout))
    }

    pub fn live(&self) -> &LiveTopology {
        &self.live
    }

    /// Resolve a command library for a node, keyed by the node's declared
    /// type and its default shell. Which libraries a node offers is fixed
    /// at build time by the catalog the suite was started with.
    pub fn library(&self, identifier: &str, name: &str) -> Result<&Library> {
        let node = self.get(identifier)?;
        self.libraries
            .library(&node.node_type, &node.default_shell, name)
            .ok_or_else(|| {
                anyhow!(
                    "node '{identifier}' ({}/{}) offers no library '{name}'",
                    node.node_type,
                    node.default_shell
                )
            })
    }

    /// All libraries a node's default shell offers.
    pub fn libraries_for(&self, identifier: &str) -> Result<&[Library]> {
        let node = self.get(identifier)?;
        Ok(self.libraries.libraries(&node.node_type, &node.default_shell))
    }

    /// Release all backend resources. Safe to call repeatedly; a partial
    /// failure can be retried and only retries what is still held.
    pub async fn teardown(&mut self) -> Result<()> {
        self.live.teardown().await.context("tearing down topology")
    }
}

/// Build a suite topology from a description string.
pub async fn build_suite_topology(
    description: &str,
    engine: Arc<dyn ProvisioningEngine>,
    options: SuiteOptions,
) -> Result<SuiteTopology> {
    SuiteTopology::build(description, engine, options).await
}

/// Tear down a suite topology, surfacing any aggregated failures.
pub async fn teardown_suite_topology(suite: &mut SuiteTopology) -> Result<()> {
    suite.teardown().await
}

static STEP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Mark a suite phase. Steps are numbered globally in execution order and
/// logged under the `topolab::step` target so they stand out in the
/// structured stream.
pub fn step(message: &str) -> u64 {
    let seq = STEP_SEQ.fetch_add(1, Ordering::Relaxed) + 1;
    info!(target: "topolab::step", step = seq, "{message}");
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
        [type=openswitch, shell=vtysh] ops1\n\
        [type=host] hs1\n\
        hs1:port1 -- ops1:port6\n";

    #[tokio::test]
    async fn builds_and_applies_session_timeout() {
        let engine: Arc<dyn ProvisioningEngine> = Arc::new(SimEngine::new());
        let options = SuiteOptions {
            session_timeout: Some(std::time::Duration::from_millis(250)),
            ..Default::default()
        };
        let suite = SuiteTopology::build(SIMPLE, engine, options).await.unwrap();

        let mut session = suite.session("ops1").await.unwrap();
        assert_eq!(session.shell_type(), "vtysh");
        assert_eq!(session.send("show version").await.unwrap(), "");
    }

    #[tokio::test]
    async fn default_node_type_fills_untyped_declarations() {
        let engine: Arc<dyn ProvisioningEngine> = Arc::new(SimEngine::new());
        let description = "sw1\nhs1\nhs1:1 -- sw1:1\n";
        let options = SuiteOptions {
            default_node_type: Some("host".to_owned()),
            ..Default::default()
        };
        let suite = SuiteTopology::build(description, engine, options)
            .await
            .unwrap();
        assert_eq!(suite.get("sw1").unwrap().node_type, "host");
    }

    #[tokio::test]
    async fn parse_failures_surface_before_provisioning() {
        let engine = Arc::new(SimEngine::new());
        let err = SuiteTopology::build("hs1", engine.clone(), SuiteOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("parsing topology description"));
        assert_eq!(engine.provision_calls(), 0);
    }

    #[test]
    fn engine_selection_rejects_unknown_kinds() {
        let mut config = EngineConfig::default();
        assert!(engine_from_config(&config).is_ok());
        config.kind = "hardware".to_owned();
        assert!(engine_from_config(&config).is_err());
    }

    #[test]
    fn steps_are_numbered_monotonically() {
        let first = step("configure");
        let second = step("verify");
        assert!(second > first);
    }
}
