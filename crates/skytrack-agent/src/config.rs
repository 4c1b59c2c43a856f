use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use skytrack_core::TrackerConfig;
#[cfg(feature = "proc")]
use skytrack_exec::ProcConfig;
use skytrack_observe::LoggerConfig;

pub const ENV_LOG_LEVEL: &str = "SKYTRACK_LOG_LEVEL";
pub const ENV_STORE_ROOT: &str = "SKYTRACK_STORE_ROOT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Tracker(#[from] skytrack_core::ConfigError),

    #[error("invalid agent config: {0}")]
    Invalid(String),
}

/// Where the shared bookkeeping files live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local; only useful for tests and single-agent setups.
    #[default]
    Memory,
    /// Directory-backed, typically a mount shared by every agent.
    Local { root: PathBuf },
}

/// Agent configuration file.
///
/// ```toml
/// tracker_id = "agent-0"
///
/// [tracker]
/// heartbeat_interval_ms = 5000
///
/// [store]
/// kind = "local"
/// root = "/mnt/shared/skytrack"
///
/// [logger]
/// format = "json"
///
/// [launcher]
/// program = "/usr/local/bin/sky-launch"
/// args = ["--cluster", "{cluster}"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Overrides the detected tracker identity.
    pub tracker_id: Option<String>,
    pub tracker: TrackerConfig,
    pub store: StoreConfig,
    pub logger: LoggerConfig,
    #[cfg(feature = "proc")]
    pub launcher: ProcConfig,
}

impl AgentConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: AgentConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reads the file and applies overrides from the process environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file(path)?.with_env(|key| std::env::var(key).ok())
    }

    /// Applies `SKYTRACK_LOG_LEVEL` and `SKYTRACK_STORE_ROOT` as returned by `lookup`.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.trim().is_empty()) {
            self.logger.level = level;
        }
        if let Some(root) = lookup(ENV_STORE_ROOT).filter(|v| !v.trim().is_empty()) {
            self.store = StoreConfig::Local {
                root: PathBuf::from(root),
            };
        }
        self.validate()?;
        Ok(self)
    }

    /// Process launcher described by the `[launcher]` section.
    #[cfg(feature = "proc")]
    pub fn process_launcher(&self) -> Result<skytrack_exec::ProcessLauncher, ConfigError> {
        skytrack_exec::ProcessLauncher::new(self.launcher.clone())
            .map_err(|e| ConfigError::Invalid(format!("launcher: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker.validate()?;
        if let Some(id) = &self.tracker_id
            && id.trim().is_empty()
        {
            return Err(ConfigError::Invalid("tracker_id is empty".into()));
        }
        if let StoreConfig::Local { root } = &self.store
            && root.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("store root is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.tracker, TrackerConfig::default());
        assert!(cfg.tracker_id.is_none());
    }

    #[test]
    fn full_document() {
        let cfg = AgentConfig::from_toml_str(
            r#"
            tracker_id = "agent-7"

            [tracker]
            heartbeat_interval_ms = 2000
            state_dir = "/home/agent/.sky"

            [store]
            kind = "local"
            root = "/mnt/shared"

            [logger]
            format = "json"
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tracker_id.as_deref(), Some("agent-7"));
        assert_eq!(cfg.tracker.heartbeat_interval_ms, 2000);
        assert_eq!(cfg.tracker.state_dir, Some(PathBuf::from("/home/agent/.sky")));
        assert_eq!(
            cfg.store,
            StoreConfig::Local {
                root: PathBuf::from("/mnt/shared")
            }
        );
        assert_eq!(cfg.logger.level, "debug");
    }

    #[test]
    fn invalid_tracker_section_is_rejected() {
        let err = AgentConfig::from_toml_str("[tracker]\npoll_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Tracker(_)));
    }

    #[test]
    fn unknown_store_kind_is_a_parse_error() {
        let err = AgentConfig::from_toml_str("[store]\nkind = \"s3\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_LOG_LEVEL, "trace"), (ENV_STORE_ROOT, "/srv/skytrack")]);
        let cfg = AgentConfig::default()
            .with_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.logger.level, "trace");
        assert_eq!(
            cfg.store,
            StoreConfig::Local {
                root: PathBuf::from("/srv/skytrack")
            }
        );
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = AgentConfig::default().with_env(|_| Some("  ".into())).unwrap();
        assert_eq!(cfg.store, StoreConfig::Memory);
        assert_eq!(cfg.logger.level, "info");
    }

    #[cfg(feature = "proc")]
    #[test]
    fn launcher_section_builds_a_process_launcher() {
        let cfg = AgentConfig::from_toml_str(
            "[launcher]\nprogram = \"sky-launch\"\nargs = [\"{cluster}\"]\n",
        )
        .unwrap();
        assert_eq!(cfg.launcher.args, vec!["{cluster}".to_string()]);
        assert!(cfg.process_launcher().is_ok());

        let err = AgentConfig::default().process_launcher().unwrap_err();
        assert!(err.to_string().contains("program is empty"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AgentConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
