//! ---
//! lab_section: "01-shared-primitives"
//! lab_subsection: "module"
//! lab_type: "source"
//! lab_scope: "code"
//! lab_description: "Harness configuration loading and validation."
//! lab_version: "v0.1.0"
//! lab_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_engine_kind() -> String {
    "sim".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the Topolab harness.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HarnessConfig {
    /// Topology description file used when none is supplied programmatically.
    #[serde(default)]
    pub description_file: Option<PathBuf>,
    /// Node type assumed for declarations without a `type` attribute.
    #[serde(default)]
    pub default_node_type: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`HarnessConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedHarnessConfig {
    pub config: HarnessConfig,
    pub source: PathBuf,
}

impl HarnessConfig {
    pub const ENV_CONFIG_PATH: &str = "TOPOLAB_CONFIG";

    /// Load configuration from disk, respecting the `TOPOLAB_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedHarnessConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedHarnessConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<HarnessConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.session.validate()?;
        if let Some(node_type) = &self.default_node_type {
            if node_type.trim().is_empty() {
                return Err(anyhow!("default_node_type must not be blank"));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for HarnessConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: HarnessConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Backend engine selection. Interpretation of `options` is engine specific.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_engine_kind")]
    pub kind: String,
    #[serde(default)]
    pub options: IndexMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: default_engine_kind(),
            options: IndexMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kind.trim().is_empty() {
            return Err(anyhow!("engine kind must not be blank"));
        }
        Ok(())
    }
}

/// Session-level defaults applied by the harness when opening sessions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Command timeout in milliseconds. Unset means no implicit timeout;
    /// commands block until the backend channel reports completion.
    #[serde(default)]
    pub command_timeout_ms: Option<u64>,
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_ms == Some(0) {
            return Err(anyhow!("command_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    /// Effective command timeout, if any.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = HarnessConfig::default();
        config.validate().unwrap();
        assert_eq!(config.engine.kind, "sim");
        assert!(config.session.command_timeout().is_none());
    }

    #[test]
    fn parses_full_document() {
        let config: HarnessConfig = r#"
            description_file = "suite.topo"
            default_node_type = "host"

            [engine]
            kind = "docker"

            [engine.options]
            network = "none"

            [session]
            command_timeout_ms = 5000

            [logging]
            directory = "target/test-logs"
            format = "pretty"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.default_node_type.as_deref(), Some("host"));
        assert_eq!(config.engine.kind, "docker");
        assert_eq!(config.engine.options.get("network").unwrap(), "none");
        assert_eq!(
            config.session.command_timeout(),
            Some(Duration::from_millis(5000))
        );
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn loads_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topolab.toml");
        std::fs::write(&path, "default_node_type = \"host\"\n").unwrap();

        let loaded =
            HarnessConfig::load_with_source(&[dir.path().join("missing.toml"), path.clone()])
                .unwrap();
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.default_node_type.as_deref(), Some("host"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = "session = { command_timeout_ms = 0 }"
            .parse::<HarnessConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("command_timeout_ms"));
    }

    #[test]
    fn rejects_blank_engine_kind() {
        let err = "engine = { kind = \" \" }"
            .parse::<HarnessConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("engine kind"));
    }
}
