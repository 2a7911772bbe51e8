//! Application configuration
//!
//! The data directory holds the SQLite file, the logs and an optional
//! `sync_config.json` describing the remote row store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};
use crate::repository::GUEST_ITEMS_KEY;

const SYNC_CONFIG_FILE: &str = "sync_config.json";
const DB_FILE: &str = "tasklist.db";
const ENV_SYNC_URL: &str = "TASKLIST_SYNC_URL";
const ENV_SYNC_TOKEN: &str = "TASKLIST_SYNC_TOKEN";

fn default_table() -> String {
    "todos".to_string()
}

/// Remote row store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the REST endpoint
    pub url: String,
    /// Project API key sent as `apikey`
    pub token: String,
    #[serde(default = "default_table")]
    pub table: String,
}

impl SyncConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            table: default_table(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub guest_key: String,
    /// `None` keeps the signed-in list in the local database
    pub sync: Option<SyncConfig>,
}

impl AppConfig {
    /// Config rooted at `data_dir`; sync settings come from the environment
    /// first, then `sync_config.json`
    pub fn load(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let sync = sync_config_from_env().or_else(|| get_sync_config(&data_dir));
        Self {
            data_dir,
            guest_key: GUEST_ITEMS_KEY.to_string(),
            sync,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn sync_config_from_env() -> Option<SyncConfig> {
    let url = std::env::var(ENV_SYNC_URL).ok()?;
    let token = std::env::var(ENV_SYNC_TOKEN).ok()?;
    if url.is_empty() || token.is_empty() {
        return None;
    }
    Some(SyncConfig::new(url, token))
}

/// Read `sync_config.json`; absent or unparsable files mean "no remote"
pub fn get_sync_config(data_dir: &Path) -> Option<SyncConfig> {
    let path = data_dir.join(SYNC_CONFIG_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str::<SyncConfig>(&raw) {
        Ok(config) if !config.url.is_empty() && !config.token.is_empty() => Some(config),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Ignoring {}: {}", path.display(), e);
            None
        }
    }
}

/// Persist sync settings into the data directory
pub fn configure_sync(data_dir: &Path, config: &SyncConfig) -> DomainResult<()> {
    if config.url.trim().is_empty() || config.token.trim().is_empty() {
        return Err(DomainError::InvalidInput(
            "Sync URL and token are required".to_string(),
        ));
    }
    std::fs::create_dir_all(data_dir).map_err(|e| DomainError::Config(e.to_string()))?;
    let json =
        serde_json::to_string_pretty(config).map_err(|e| DomainError::Config(e.to_string()))?;
    std::fs::write(data_dir.join(SYNC_CONFIG_FILE), json)
        .map_err(|e| DomainError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(get_sync_config(dir.path()), None);

        let config = SyncConfig::new("https://db.example.com", "anon-key");
        configure_sync(dir.path(), &config).unwrap();
        assert_eq!(get_sync_config(dir.path()), Some(config));
    }

    #[test]
    fn test_table_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SYNC_CONFIG_FILE),
            r#"{"url": "https://db.example.com", "token": "k"}"#,
        )
        .unwrap();
        assert_eq!(get_sync_config(dir.path()).unwrap().table, "todos");
    }

    #[test]
    fn test_corrupt_config_means_no_remote() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SYNC_CONFIG_FILE), "{not json").unwrap();
        assert_eq!(get_sync_config(dir.path()), None);
    }

    #[test]
    fn test_configure_rejects_blank_fields() {
        let dir = tempfile::tempdir().unwrap();
        let result = configure_sync(dir.path(), &SyncConfig::new(" ", "k"));
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_paths_live_under_data_dir() {
        let config = AppConfig {
            data_dir: PathBuf::from("/tmp/tasks"),
            guest_key: GUEST_ITEMS_KEY.to_string(),
            sync: None,
        };
        assert_eq!(config.db_path(), PathBuf::from("/tmp/tasks/tasklist.db"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/tasks/logs"));
    }
}
