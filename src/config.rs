use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AppError, AppResult};

pub const DEFAULT_API_BASE: &str = "https://botapi.max.ru";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub max_attachment_size_mb: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 120,
            max_attachment_size_mb: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn log_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse()
            .unwrap_or(log::LevelFilter::Info)
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("MAX Broadcast");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    load_config_from(&get_config_path()?)
}

pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    if config_path.exists() {
        let config_str = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save_config_to(&default_config, config_path)?;
        Ok(default_config)
    }
}

pub fn save_config(config: &Config) -> AppResult<()> {
    save_config_to(config, &get_config_path()?)
}

pub fn save_config_to(config: &Config, config_path: &Path) -> AppResult<()> {
    validate_config(config)?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    let api_base = config.api_base.trim();
    if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
        return Err(AppError::validation(
            "api_base",
            "Must be an http:// or https:// URL",
        ));
    }

    if config.request_timeout_secs == 0 || config.request_timeout_secs > 600 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be between 1 and 600",
        ));
    }

    if config.max_attachment_size_mb == 0 || config.max_attachment_size_mb > 2048 {
        return Err(AppError::validation(
            "max_attachment_size_mb",
            "Must be between 1 and 2048",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

// Reset configuration to defaults
pub fn reset_config() -> AppResult<()> {
    reset_config_at(&get_config_path()?)
}

pub fn reset_config_at(config_path: &Path) -> AppResult<()> {
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.reset_backup");
        fs::copy(config_path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    save_config_to(&Config::default(), config_path)?;

    log::info!("Configuration reset to defaults");
    Ok(())
}
