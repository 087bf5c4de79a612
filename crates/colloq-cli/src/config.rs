//! Configuration file support

use colloq_sync::NamingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const TOKEN_ENV_VAR: &str = "COLLOQ_TOKEN";

/// Configuration for colloq
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat API
    pub base_url: Option<String>,
    /// Bearer token (alternative to COLLOQ_TOKEN)
    pub token: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Conversation naming rules
    pub naming: NamingConfig,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("colloq")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("COLLOQ_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse config file: {}", e);
                Self::default()
            }),
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            base_url: Some(DEFAULT_BASE_URL.to_string()),
            token: None,
            timeout_secs: Some(colloq_api::backend::http::DEFAULT_TIMEOUT.as_secs()),
            naming: NamingConfig::default(),
        };

        default_config.save()?;
        Ok(path)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(colloq_api::backend::http::DEFAULT_TIMEOUT)
    }

    /// Get the bearer token, checking config then env
    pub fn token(&self) -> Option<String> {
        colloq_api::backend::get_token(self.token.as_deref(), TOKEN_ENV_VAR)
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# colloq configuration file
# Place at ~/.config/colloq/config.toml (Linux/Mac) or %APPDATA%\colloq\config.toml (Windows)

# Base URL of the chat API
base_url = "http://localhost:8000/api"

# Bearer token (optional - can also use the COLLOQ_TOKEN environment variable)
# token = "eyJ..."

# Request timeout in seconds
timeout_secs = 30

# How conversations are named after their first message
[naming]
default_name = "New Chat"
title_max_chars = 30
ellipsis = "..."
"#
}
