//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variables consulted for the service API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["SKILLSET_API_KEY", "SEARCH_API_KEY"];

/// Default REST API version sent with every request
pub const DEFAULT_API_VERSION: &str = "2021-04-30-Preview";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Skillset configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Search service endpoint, e.g. `https://my-service.search.windows.net`
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: default_api_version(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// API key from the first non-empty variable in [`API_KEY_ENV_VARS`]
    pub fn resolved_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.is_empty()))
    }

    pub fn redacted_api_key(&self) -> Option<String> {
        self.resolved_api_key().map(|key| redact(&key))
    }

    /// The configured endpoint, or an error pointing at how to set it
    pub fn require_endpoint(&self) -> anyhow::Result<&str> {
        self.endpoint.as_deref().ok_or_else(|| {
            anyhow!("No service endpoint configured. Run `skillset config set service.endpoint <url>`.")
        })
    }
}

fn redact(key: &str) -> String {
    let count = key.chars().count();
    if count <= 4 {
        "***".to_string()
    } else {
        let suffix: String = key.chars().skip(count - 4).collect();
        format!("***{}", suffix)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("SKILLSET_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("skillset")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or fall back to defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::config_path()?;

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let raw: toml::Value = toml::from_str(contents)?;
        if raw
            .get("service")
            .and_then(|s| s.get("api_key"))
            .is_some()
        {
            return Err(anyhow!(
                "service.api_key must not be stored in the config file. Set SKILLSET_API_KEY instead."
            ));
        }

        let config: Config = raw.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(endpoint) = &self.service.endpoint {
            validate_endpoint(endpoint)?;
        }
        if self.service.timeout_secs == 0 {
            return Err(anyhow!("service.timeout_secs must be greater than zero"));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "service.endpoint" => Ok(self
                .service
                .endpoint
                .clone()
                .unwrap_or_else(|| "(not set)".to_string())),
            "service.api_version" => Ok(self.service.api_version.clone()),
            "service.timeout_secs" => Ok(self.service.timeout_secs.to_string()),

            // API key (special handling - show redacted)
            "service.api_key" | "api_key" => match self.service.redacted_api_key() {
                Some(redacted) => Ok(redacted),
                None => Ok("(not set - use SKILLSET_API_KEY or SEARCH_API_KEY env var)".to_string()),
            },

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `skillset config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "service.endpoint" => {
                let endpoint = value.trim().trim_end_matches('/');
                validate_endpoint(endpoint)?;
                self.service.endpoint = Some(endpoint.to_string());
            }
            "service.api_version" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("API version must not be empty"));
                }
                self.service.api_version = value.trim().to_string();
            }
            "service.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("Timeout must be greater than zero"));
                }
                self.service.timeout_secs = secs;
            }

            // API key cannot be set via config
            "service.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration for security. \
                     Set the SKILLSET_API_KEY or SEARCH_API_KEY environment variable instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `skillset config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "service.endpoint",
            "service.api_version",
            "service.timeout_secs",
            "service.api_key",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn validate_endpoint(endpoint: &str) -> anyhow::Result<()> {
    let url = reqwest::Url::parse(endpoint)
        .with_context(|| format!("Invalid service endpoint: {}", endpoint))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(anyhow!(
            "Service endpoint must use http or https, got '{}'",
            url.scheme()
        ));
    }
    Ok(())
}
