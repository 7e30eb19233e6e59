use crate::api_client::ApiConfig;
use crate::image_source::ImageSourceConfig;
use crate::logo_pipeline::{LogoJob, PadJob};
use crate::seeder::SeedingConfig;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "MENU_MEDIA_CONFIG";
const APP_DIR_NAME: &str = "menu-media-tools";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub image_source: ImageSourceConfig,
    pub seeding: SeedingConfig,
    pub logo: LogoJob,
    pub pad: PadJob,
}

impl AppConfig {
    /// Standard per-user location, e.g. `~/.config/menu-media-tools/config.json`.
    pub fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Picks the config file: `$MENU_MEDIA_CONFIG`, then the per-user file,
    /// then `config.json` in the working directory.
    pub fn resolve_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }

        let user_path = Self::user_config_path();
        if user_path.exists() {
            return user_path;
        }

        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return local_path;
        }

        user_path
    }

    /// Loads the resolved config, falling back to defaults when no file exists.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        let path = Self::resolve_path();
        if !path.exists() {
            warn!("⚠ No config at {}, using defaults", path.display());
            return Ok((Self::default(), path));
        }

        let config = Self::load_from(&path)?;
        info!("✅ Loaded config from {}", path.display());
        Ok((config, path))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 Saved config to {}", path.display());
        Ok(())
    }
}
