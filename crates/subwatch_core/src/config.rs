//! Core runtime configuration.
//!
//! # Responsibility
//! - Describe the knobs a host passes to the core at startup.
//! - Load them from a JSON file and reject inconsistent values early.
//!
//! # Invariants
//! - Missing fields fall back to defaults; unknown fields are rejected.
//! - A validated config always negotiates to exactly one store backend.

use crate::logging::{default_log_level, normalize_level};
use crate::repo::host::{
    negotiate_store, parse_host_capability, HostCapability, HostSelectionError, StoreSelection,
    HOST_CAPABILITY_MEMORY, HOST_CAPABILITY_SQLITE_FILE, HOST_CAPABILITY_SQLITE_MEMORY,
};
use crate::sync::surface::SurfaceOptions;
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ONE_SHOT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    /// Database file used when the host offers `sqlite_file`.
    pub db_path: Option<PathBuf>,
    /// Storage capabilities offered by the host, any order.
    pub host_capabilities: Vec<String>,
    pub one_shot_timeout_ms: u64,
    /// Per-inbox event buffer before a slow surface lags.
    pub broadcast_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            db_path: None,
            host_capabilities: vec![
                HOST_CAPABILITY_SQLITE_FILE.to_string(),
                HOST_CAPABILITY_SQLITE_MEMORY.to_string(),
                HOST_CAPABILITY_MEMORY.to_string(),
            ],
            one_shot_timeout_ms: DEFAULT_ONE_SHOT_TIMEOUT_MS,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Reads and validates a JSON config file.
    ///
    /// # Errors
    /// - `Io` when the file cannot be read.
    /// - `Parse` on malformed JSON or unknown fields.
    /// - Any error from [`CoreConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw)?;
        info!(
            "event=config_load module=config status=ok path={} capabilities={}",
            path.display(),
            config.host_capabilities.join(",")
        );
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "log_dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        if self.one_shot_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "one_shot_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid(
                "broadcast_capacity must be greater than zero".to_string(),
            ));
        }
        self.store_selection()?;
        Ok(())
    }

    pub fn capabilities(&self) -> Result<Vec<HostCapability>, ConfigError> {
        self.host_capabilities
            .iter()
            .map(|value| parse_host_capability(value).map_err(ConfigError::Capability))
            .collect()
    }

    pub fn store_selection(&self) -> Result<StoreSelection, ConfigError> {
        negotiate_store(&self.capabilities()?, self.db_path.as_ref())
            .map_err(ConfigError::Capability)
    }

    pub fn one_shot_timeout(&self) -> Duration {
        Duration::from_millis(self.one_shot_timeout_ms)
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            one_shot_timeout: self.one_shot_timeout(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    Invalid(String),
    Capability(HostSelectionError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
            Self::Capability(err) => write!(f, "invalid host capabilities: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Capability(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::repo::host::StoreSelection;
    use std::path::PathBuf;

    #[test]
    fn defaults_validate_and_fall_back_to_sqlite_memory_without_path() {
        let config = CoreConfig::default();
        config.validate().expect("defaults should validate");
        assert_eq!(
            config.store_selection().expect("selection"),
            StoreSelection::SqliteMemory
        );
        assert_eq!(config.one_shot_timeout_ms, 10_000);
        assert_eq!(config.broadcast_capacity, 256);
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = CoreConfig::from_json(
            r#"{"db_path": "/tmp/subwatch.sqlite3", "one_shot_timeout_ms": 500}"#,
        )
        .expect("partial config should parse");
        assert_eq!(config.one_shot_timeout_ms, 500);
        assert_eq!(config.broadcast_capacity, 256);
        assert_eq!(
            config.store_selection().expect("selection"),
            StoreSelection::SqliteFile(PathBuf::from("/tmp/subwatch.sqlite3"))
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = CoreConfig::from_json(r#"{"logLevel": "info"}"#)
            .expect_err("unknown field should fail");
        assert!(matches!(error, ConfigError::Parse(_)));
    }

    #[test]
    fn unsupported_capability_is_rejected() {
        let error = CoreConfig::from_json(r#"{"host_capabilities": ["indexeddb"]}"#)
            .expect_err("unknown capability should fail");
        assert!(matches!(error, ConfigError::Capability(_)));
    }

    #[test]
    fn zero_capacity_and_relative_log_dir_are_invalid() {
        let zero = CoreConfig {
            broadcast_capacity: 0,
            ..CoreConfig::default()
        };
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));

        let relative = CoreConfig {
            log_dir: Some(PathBuf::from("logs")),
            ..CoreConfig::default()
        };
        assert!(matches!(relative.validate(), Err(ConfigError::Invalid(_))));
    }
}
