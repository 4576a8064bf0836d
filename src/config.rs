use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use fitplan::panel::RefreshPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_USER_ID: i64 = 1;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Base URL of the plan backend
    pub api_url: ConfigValue<String>,
    /// Upload endpoint of the storage service
    pub upload_url: ConfigValue<String>,
    /// User the console acts as; stamped on every saved plan
    pub user_id: ConfigValue<i64>,
    /// When lists are refetched in the console
    pub refresh: ConfigValue<RefreshPolicy>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    api_url: Option<String>,
    upload_url: Option<String>,
    user_id: Option<i64>,
    refresh: Option<RefreshPolicy>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_from(config_path, |key| std::env::var(key).ok())
    }

    fn load_from(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut api_url = ConfigValue::new(DEFAULT_API_URL.to_string(), ConfigSource::Default);
        let mut upload_url: Option<ConfigValue<String>> = None;
        let mut user_id = ConfigValue::new(DEFAULT_USER_ID, ConfigSource::Default);
        let mut refresh = ConfigValue::new(RefreshPolicy::default(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(url) = file_config.api_url {
                api_url = ConfigValue::new(url, ConfigSource::File);
            }
            if let Some(url) = file_config.upload_url {
                upload_url = Some(ConfigValue::new(url, ConfigSource::File));
            }
            if let Some(id) = file_config.user_id {
                user_id = ConfigValue::new(id, ConfigSource::File);
            }
            if let Some(policy) = file_config.refresh {
                refresh = ConfigValue::new(policy, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Some(url) = env("FITPLAN_API_URL") {
            api_url = ConfigValue::new(url, ConfigSource::Environment);
        }
        if let Some(url) = env("FITPLAN_UPLOAD_URL") {
            upload_url = Some(ConfigValue::new(url, ConfigSource::Environment));
        }
        if let Some(raw) = env("FITPLAN_USER_ID") {
            let id = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FITPLAN_USER_ID".to_string(), raw))?;
            user_id = ConfigValue::new(id, ConfigSource::Environment);
        }
        if let Some(raw) = env("FITPLAN_REFRESH") {
            let policy = raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("FITPLAN_REFRESH".to_string(), raw))?;
            refresh = ConfigValue::new(policy, ConfigSource::Environment);
        }

        // The storage service lives next to the API unless configured
        let upload_url = upload_url.unwrap_or_else(|| {
            ConfigValue::new(
                format!("{}/upload", api_url.value.trim_end_matches('/')),
                ConfigSource::Default,
            )
        });

        Ok(Self {
            api_url,
            upload_url,
            user_id,
            refresh,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitplan/
    /// - macOS: ~/Library/Application Support/fitplan/
    /// - Windows: %APPDATA%/fitplan/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitplan")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
