//! Application configuration
//!
//! Values come from `~/.config/palace/config.toml` (or `$PALACE_CONFIG`),
//! then `PALACE_DATA_DIR`, `PALACE_BACKUP_DIR` and `PALACE_LOG_FILE` override
//! them. Anything unset falls back to the platform data directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the store keeps its data and backups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Holds `palace.db`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Where exported backups go (defaults to `<data_dir>/backups`)
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,

    /// Log file used when PALACE_LOG is set (defaults to stderr)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backup_dir: None,
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the config file, then apply `PALACE_*` overrides
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `path`; a missing file means defaults
    ///
    /// Creates the data directory.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_overrides(env_var);
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", config.data_dir))?;
        Ok(config)
    }

    /// Parse TOML and apply `PALACE_*` overrides
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_overrides(env_var);
        Ok(config)
    }

    /// `lookup` maps a variable name to its value; an empty value clears the
    /// optional paths
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("PALACE_DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("PALACE_BACKUP_DIR") {
            self.backup_dir = non_empty_path(val);
        }
        if let Some(val) = lookup("PALACE_LOG_FILE") {
            self.log_file = non_empty_path(val);
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))
    }

    /// `$PALACE_CONFIG`, or `config.toml` in the platform config directory
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("PALACE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("palace")
            .join("config.toml")
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("palace.db")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("backups"))
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("palace")
}

fn non_empty_path(val: String) -> Option<PathBuf> {
    if val.is_empty() {
        None
    } else {
        Some(PathBuf::from(val))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.backup_dir.is_none());
        assert!(config.log_file.is_none());
        assert!(config.data_dir.ends_with("palace"));
    }

    #[test]
    fn test_file_paths() {
        let config = Config {
            data_dir: PathBuf::from("/data/palace"),
            backup_dir: None,
            log_file: None,
        };

        assert_eq!(config.database_path(), PathBuf::from("/data/palace/palace.db"));
        assert_eq!(config.backup_dir(), PathBuf::from("/data/palace/backups"));

        let config = Config {
            backup_dir: Some(PathBuf::from("/mnt/usb")),
            ..config
        };
        assert_eq!(config.backup_dir(), PathBuf::from("/mnt/usb"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(vars(&[
            ("PALACE_DATA_DIR", "/tmp/palace-test"),
            ("PALACE_BACKUP_DIR", "/tmp/backups"),
        ]));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/palace-test"));
        assert_eq!(config.backup_dir, Some(PathBuf::from("/tmp/backups")));
        assert!(config.log_file.is_none());

        // Empty value clears an optional path
        config.apply_overrides(vars(&[("PALACE_BACKUP_DIR", "")]));
        assert!(config.backup_dir.is_none());
        assert_eq!(config.data_dir, PathBuf::from("/tmp/palace-test"));
    }

    #[test]
    fn test_toml_fields() {
        let config: Config = toml::from_str(
            r#"
            data_dir = "/custom/data"
            log_file = "/custom/palace.log"
        "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.log_file, Some(PathBuf::from("/custom/palace.log")));
        assert!(config.backup_dir.is_none());

        let empty: Config = toml::from_str("").unwrap();
        assert_eq!(empty.data_dir, default_data_dir());
    }

    #[test]
    fn test_save_then_parse() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            backup_dir: Some(temp_dir.path().join("backups")),
            log_file: None,
        };
        config.save_to_path(&path).unwrap();

        let saved: Config = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.data_dir, config.data_dir);
        assert_eq!(saved.backup_dir, config.backup_dir);
        assert_eq!(saved.log_file, None);
    }
}
