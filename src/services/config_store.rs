// Configuration Storage Service
// Handles config file read/write and version backup

use crate::models::{AnalysisOptions, RiskThresholds};
use crate::services::classifier::ClassifierOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub version: String,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    pub base_url: Option<String>,
    #[serde(default)]
    pub options: ClassifierOptions,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            options: ClassifierOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisConfig {
    #[serde(default = "default_max_section_length")]
    pub max_section_length: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_section_length: default_max_section_length(),
            concurrency: default_concurrency(),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Expand into full analysis options; fields the config file does not
    /// carry keep their defaults.
    pub fn to_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            max_section_length: self.max_section_length,
            concurrency: self.concurrency,
            risk_thresholds: self.risk_thresholds,
            ..AnalysisOptions::default()
        }
    }
}

fn default_max_section_length() -> usize { 1500 }
fn default_concurrency() -> usize { 4 }

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
        dirs::config_dir().map(|p| p.join("compliscan"))
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Could not create config dir: {}", e))
    }

    /// Load configuration, defaulting when no file exists yet
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Could not read config file: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Config file is not valid JSON: {}", e))
    }

    /// Persist configuration, snapshotting the previous version first
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Could not serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Could not write config file: {}", e))
    }

    /// Copy the current config into the backups directory, retaining 10
    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Could not create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Backup copy failed: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Drop the oldest backups beyond the retention count
    fn cleanup_old_backups(&self, backup_dir: &PathBuf, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Could not list backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        let excess = entries.len().saturating_sub(keep);
        if excess == 0 {
            return Ok(());
        }

        // Oldest first, by modification time
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(excess) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Get classifier API key from config file
    pub fn get_api_key(&self, provider: &str) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.api_keys.get(provider).cloned())
    }

    /// Store classifier API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.to_string());
        self.save(&config)
    }

    /// Delete classifier API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }

    /// Get classifier base URL override from config file
    pub fn get_classifier_url(&self) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.classifier.base_url)
    }

    /// Set classifier base URL override in config file
    pub fn set_classifier_url(&self, url: &str) -> Result<(), String> {
        let mut config = self.load()?;
        config.classifier.base_url = Some(url.to_string());
        self.save(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.analysis.max_section_length, 1500);
        assert_eq!(config.analysis.concurrency, 4);
        assert_eq!(config.classifier.options.max_attempts, 3);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig {
            version: "1.0.0".to_string(),
            classifier: ClassifierConfig::default(),
            analysis: AnalysisConfig::default(),
            api_keys: HashMap::new(),
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.version, "1.0.0");
        assert_eq!(parsed.analysis.risk_thresholds.high, 0.75);
    }

    #[test]
    fn test_analysis_config_expands_to_options() {
        let config = AnalysisConfig {
            max_section_length: 800,
            concurrency: 2,
            risk_thresholds: RiskThresholds { high: 0.8, medium: 0.5 },
        };
        let options = config.to_options();

        assert_eq!(options.max_section_length, 800);
        assert_eq!(options.concurrency, 2);
        assert_eq!(options.risk_thresholds.high, 0.8);
        // Fields the config file does not carry keep their defaults.
        assert_eq!(options.preview_chars, AnalysisOptions::default().preview_chars);
        assert_eq!(
            options.candidate_labels,
            AnalysisOptions::default().candidate_labels
        );
    }

    #[test]
    fn test_classifier_url_round_trip() {
        let dir = std::env::temp_dir().join(format!("compliscan-test-{}", uuid::Uuid::new_v4()));
        let store = ConfigStore::new(dir.clone());

        assert_eq!(store.get_classifier_url().unwrap(), None);
        store.set_classifier_url("http://127.0.0.1:8080/model").unwrap();
        assert_eq!(
            store.get_classifier_url().unwrap().as_deref(),
            Some("http://127.0.0.1:8080/model")
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_round_trip_on_disk() {
        let dir = std::env::temp_dir().join(format!("compliscan-test-{}", uuid::Uuid::new_v4()));
        let store = ConfigStore::new(dir.clone());

        let mut config = store.load().unwrap();
        config.version = "1.0.0".to_string();
        store.save(&config).unwrap();
        store.set_api_key("huggingface", "hf_test").unwrap();

        assert_eq!(
            store.get_api_key("huggingface").unwrap().as_deref(),
            Some("hf_test")
        );
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.version, "1.0.0");

        let _ = std::fs::remove_dir_all(dir);
    }
}
