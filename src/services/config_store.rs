// Configuration Storage Service
// Handles config file read/write, version backup and stored API keys

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::ConcurrencyPolicy;
use crate::services::providers::{DEFAULT_TIMEOUT_SECS, GEMINI_DEFAULT_MODEL};

const DEFAULT_MODEL_DIR: &str = "models";
const CONFIG_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to create config dir: {0}")]
    CreateDir(std::io::Error),
    #[error("Failed to read config: {0}")]
    Read(std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to write config: {0}")]
    Write(std::io::Error),
    #[error("Failed to create backup: {0}")]
    Backup(std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Directory holding `sentiment_model.json` and `vectorizer.json`.
    #[serde(default)]
    pub model_dir: Option<String>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            model_dir: None,
            remote: RemoteConfig::default(),
            concurrency: ConcurrencyPolicy::default(),
            api_keys: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// `DUYGU_MODEL_DIR` wins over the config file, which wins over `./models`.
    pub fn resolved_model_dir(&self) -> PathBuf {
        if let Ok(dir) = env::var("DUYGU_MODEL_DIR") {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir.trim());
            }
        }
        self.model_dir
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    #[serde(default = "default_remote_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            model: default_remote_model(),
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_version() -> String { CONFIG_VERSION.to_string() }
fn default_remote_model() -> String { GEMINI_DEFAULT_MODEL.to_string() }
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("duygu"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(ConfigError::CreateDir)
    }

    /// Load configuration from file; a missing file yields defaults
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(ConfigError::Read)?;
        serde_json::from_str(&content).map_err(ConfigError::Parse)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config).map_err(ConfigError::Parse)?;
        fs::write(&self.config_file, content).map_err(ConfigError::Write)
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(ConfigError::Backup)?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));
        fs::copy(&self.config_file, &backup_file).map_err(ConfigError::Backup)?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), ConfigError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(ConfigError::Backup)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Names carry the timestamp, so lexical order is chronological.
        entries.sort_by_key(|e| e.file_name());
        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), ConfigError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.trim().to_string());
        self.save(&config)
    }
}
