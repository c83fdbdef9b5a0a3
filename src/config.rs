//! Runtime configuration.
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/artpick/config.toml` (or the platform
//! config dir). A missing file means defaults.
//!
//! ```toml
//! api_base_url = "https://api.artic.edu/api/v1"
//! page_size = 12
//! request_timeout_secs = 10
//! ```
//!
//! `ARTPICK_API_BASE_URL`, `ARTPICK_PAGE_SIZE` and `ARTPICK_TIMEOUT_SECS`
//! override the file; command-line flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "https://api.artic.edu/api/v1";
pub const DEFAULT_PAGE_SIZE: usize = 12;
/// Upper bound the artworks API accepts for `limit`.
pub const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub page_size: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: concat!("artpick/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a specific file. Returns defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file path, honoring `XDG_CONFIG_HOME` first.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("artpick").join("config.toml"));
        }

        dirs::config_dir()
            .map(|p| p.join("artpick").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Apply `ARTPICK_*` overrides. Unparseable numbers are errors rather
    /// than silently ignored.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = dotenvy::var("ARTPICK_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Ok(val) = dotenvy::var("ARTPICK_PAGE_SIZE") {
            self.page_size = val.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("ARTPICK_PAGE_SIZE is not a number: {val}"))
            })?;
        }
        if let Ok(val) = dotenvy::var("ARTPICK_TIMEOUT_SECS") {
            self.request_timeout_secs = val.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("ARTPICK_TIMEOUT_SECS is not a number: {val}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api_base_url cannot be empty".into(),
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
