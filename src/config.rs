use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::{error::SixxError, named::SortMode, sort::DEFAULT_HORIZON};

/// Settings for report runs, read from a TOML file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SixxConfig {
    /// The language names are displayed and sorted in.
    pub language: String,
    pub sort_mode: SortMode,
    /// How far back a listing looks for an entry before printing a reference to it.
    pub horizon: usize,
    /// The place phone numbers are shown relative to: a country or area name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// Input files and directories used when none are given on the command line.
    pub files: Vec<PathBuf>,
    /// A `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for SixxConfig {
    fn default() -> Self {
        SixxConfig {
            language: "en".to_string(),
            sort_mode: SortMode::default(),
            horizon: DEFAULT_HORIZON,
            home: None,
            files: Vec::new(),
            log_filter: None,
        }
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<SixxConfig, SixxError>;
    fn set_config(&self, config: &SixxConfig) -> Result<(), SixxError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<SixxConfig, SixxError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(SixxConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &SixxConfig) -> Result<(), SixxError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        write(&self.path, toml::to_string(config)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("sixx.toml"));
        let config = provider.get_config().unwrap();
        assert_eq!(config, SixxConfig::default());
        assert_eq!(config.horizon, 8);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sixx.toml");
        std::fs::write(&path, "sort_mode = \"last-name\"\nhome = \"SA\"\n").unwrap();
        let config = TomlConfigProvider::new(path).get_config().unwrap();
        assert_eq!(config.sort_mode, SortMode::LastName);
        assert_eq!(config.home.as_deref(), Some("SA"));
        assert_eq!(config.horizon, DEFAULT_HORIZON);
    }

    #[test]
    fn config_written_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("sixx.toml"));
        let config = SixxConfig {
            language: "es".to_string(),
            files: vec![PathBuf::from("contacts")],
            log_filter: Some("sixx_core=debug".to_string()),
            ..SixxConfig::default()
        };
        provider.set_config(&config).unwrap();
        assert_eq!(provider.get_config().unwrap(), config);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sixx.toml");
        std::fs::write(&path, "horizon = \"far\"\n").unwrap();
        let err = TomlConfigProvider::new(path).get_config().unwrap_err();
        assert!(matches!(err, SixxError::Serialization(_)));
    }
}
