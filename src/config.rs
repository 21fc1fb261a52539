use serde::Deserialize;
use std::fs;
use std::path::Path;
use crate::constants;
use crate::error::{AppError, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "PHOTO_INTERVALS_CONFIG";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub columns: ColumnsConfig,
    pub preview: PreviewConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub timeout_seconds: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: constants::DEFAULT_TIMEOUT_SECONDS,
            max_redirects: constants::DEFAULT_MAX_REDIRECTS,
            user_agent: format!("photo_intervals/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Header labels and content marker used by column detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub before_labels: Vec<String>,
    pub after_labels: Vec<String>,
    pub marker: String,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            before_labels: constants::default_before_labels(),
            after_labels: constants::default_after_labels(),
            marker: constants::TIMESTAMP_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub max_rows: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { max_rows: constants::DEFAULT_PREVIEW_ROWS }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: constants::DEFAULT_BIND_ADDR.to_string() }
    }
}

impl Config {
    /// Load configuration from an explicit path, the `PHOTO_INTERVALS_CONFIG`
    /// env var, or `config.toml`. A missing default file yields the defaults;
    /// a missing explicitly requested file is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(CONFIG_PATH_ENV) {
                Ok(p) if !p.trim().is_empty() => (p.into(), true),
                _ => (DEFAULT_CONFIG_PATH.into(), false),
            },
        };

        if !config_path.exists() {
            if required {
                return Err(AppError::Config(format!(
                    "Config file '{}' does not exist",
                    config_path.display()
                )));
            }
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            AppError::Config(format!("Failed to read config file '{}': {}", config_path.display(), e))
        })?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.resolver.timeout_seconds == 0 {
            return Err(AppError::Config("resolver.timeout_seconds must be positive".into()));
        }
        if self.columns.marker.is_empty() {
            return Err(AppError::Config("columns.marker must not be empty".into()));
        }
        if self.columns.before_labels.is_empty() || self.columns.after_labels.is_empty() {
            return Err(AppError::Config("columns labels must not be empty".into()));
        }
        Ok(())
    }
}
