//! Configuration management.
//!
//! Configuration is stored in ~/.facegroup/config.yaml. The database lives
//! next to it under data/ unless `db` says otherwise.

use std::path::{Path, PathBuf};

use facegroup_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".facegroup";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Default database path, relative to the base directory.
pub const DEFAULT_DB_FILE: &str = "data/faces.redb";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Database file (optional, defaults to ~/.facegroup/data/faces.redb).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Resolves the database path: `override_path`, then the config value,
    /// then the default under the base directory.
    pub fn db_path(&self, override_path: Option<&str>) -> anyhow::Result<PathBuf> {
        if let Some(p) = override_path.or(self.db.as_deref()) {
            return Ok(PathBuf::from(p));
        }
        Self::default_config_dir()
            .map(|dir| dir.join(DEFAULT_DB_FILE))
            .ok_or_else(|| anyhow::anyhow!("cannot determine database path"))
    }
}

/// Loads the configuration, creating an empty file on first use.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.config_path = config_path;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let cfg = load_config(path.to_str()).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.pipeline, PipelineConfig::default());
        assert_eq!(cfg.path(), path.as_path());
    }

    #[test]
    fn reads_pipeline_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "pipeline:\n  dim: 128\n  k: 3\ndb: /tmp/x.redb\n").unwrap();

        let cfg = load_config(path.to_str()).unwrap();
        assert_eq!(cfg.pipeline.dim, 128);
        assert_eq!(cfg.pipeline.k, 3);
        assert_eq!(cfg.db_path(None).unwrap(), PathBuf::from("/tmp/x.redb"));
        assert_eq!(cfg.db_path(Some("other.redb")).unwrap(), PathBuf::from("other.redb"));
    }
}
