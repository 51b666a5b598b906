//! Configuration for neurovault, persisted as TOML.
//!
//! Stored at `$XDG_CONFIG_HOME/neurovault/config.toml`. Every field has a
//! default, so an empty or partial file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::paths::VaultPaths;

/// Errors from configuration loading and saving.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(neurovault::config::read),
        help("Ensure the config file exists and is readable, or run `neurovault config init`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(neurovault::config::parse),
        help("Check the TOML syntax and value types in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(neurovault::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// User-facing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Directory holding the graph snapshot. Defaults to the XDG data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Snapshot file name inside `data_dir`.
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
    /// `user_id` stamped on imports that do not name one.
    #[serde(default = "default_user_id")]
    pub default_user_id: String,
    /// Load the bundled sample graph as the seed tier.
    #[serde(default = "default_true")]
    pub include_seed_graph: bool,
    /// Replace the bundled seed graph with this TOML file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_file: Option<PathBuf>,
    /// Minimum seconds between sync passes.
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,
    /// Seconds between sync eligibility checks.
    #[serde(default = "default_sync_check_secs")]
    pub sync_check_secs: u64,
    /// Conversation/summary record file inside `data_dir`.
    #[serde(default = "default_records_file")]
    pub records_file: String,
}

fn default_snapshot_file() -> String {
    "generated_graph.json".into()
}
fn default_user_id() -> String {
    "local-user-1".into()
}
fn default_true() -> bool {
    true
}
fn default_sync_interval_secs() -> u64 {
    30 * 60
}
fn default_sync_check_secs() -> u64 {
    60
}
fn default_records_file() -> String {
    "records.json".into()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            snapshot_file: default_snapshot_file(),
            default_user_id: default_user_id(),
            include_seed_graph: true,
            seed_file: None,
            sync_interval_secs: default_sync_interval_secs(),
            sync_check_secs: default_sync_check_secs(),
            records_file: default_records_file(),
        }
    }
}

impl VaultConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Effective data directory: explicit setting or the XDG data dir.
    pub fn resolved_data_dir(&self, paths: &VaultPaths) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| paths.data_dir.clone())
    }

    pub fn records_path(&self, paths: &VaultPaths) -> PathBuf {
        self.resolved_data_dir(paths).join(&self.records_file)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn sync_check_interval(&self) -> Duration {
        Duration::from_secs(self.sync_check_secs)
    }

    /// Convert to an [`EngineConfig`] using resolved paths.
    pub fn to_engine_config(&self, paths: &VaultPaths) -> EngineConfig {
        EngineConfig {
            data_dir: Some(self.resolved_data_dir(paths)),
            snapshot_file: self.snapshot_file.clone(),
            default_user_id: self.default_user_id.clone(),
            include_seed_graph: self.include_seed_graph,
            seed_file: self.seed_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = VaultConfig::default();
        assert_eq!(config.snapshot_file, "generated_graph.json");
        assert_eq!(config.default_user_id, "local-user-1");
        assert_eq!(config.sync_interval(), Duration::from_secs(1800));
        assert_eq!(config.sync_check_interval(), Duration::from_secs(60));
        assert!(config.include_seed_graph);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: VaultConfig =
            toml::from_str("default_user_id = \"alice\"\ninclude_seed_graph = false\n").unwrap();
        assert_eq!(config.default_user_id, "alice");
        assert!(!config.include_seed_graph);
        assert_eq!(config.records_file, "records.json");
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = VaultConfig {
            data_dir: Some(dir.path().join("data")),
            sync_interval_secs: 5,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(VaultConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = VaultConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, VaultConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "sync_interval_secs = \"soon\"").unwrap();
        assert!(matches!(VaultConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn engine_config_uses_xdg_data_dir_by_default() {
        let paths = VaultPaths::rooted("/tmp/nv");
        let engine = VaultConfig::default().to_engine_config(&paths);
        assert_eq!(engine.data_dir, Some(PathBuf::from("/tmp/nv/data")));
    }
}
