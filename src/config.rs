//! Configuration management for rigcheck

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::models::HardwareProfile;

/// Default upstream HTTP timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog metadata API credentials and endpoints
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// AI verdict provider settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Upstream HTTP timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Override for the analysis cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// The local user's hardware profile (CLI usage).
    /// Updating it through `rigcheck profile set` invalidates that user's
    /// cached verdicts.
    #[serde(default)]
    pub profile: HardwareProfile,
}

/// Catalog + storefront upstream settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Override for the catalog metadata base URL (tests, mirrors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,

    /// Override for the storefront base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storefront_url: Option<String>,

    /// Override for the identity provider token endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

/// AI verdict provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model identifier; a small model suffices for a directional verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Override for the AI provider base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Config {
    /// Get the default config file path (~/.rigcheck/config.yaml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".rigcheck").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Config holds upstream credentials - restrict to owner on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Catalog credentials, or an actionable error when unset
    pub fn catalog_credentials(&self) -> Result<(String, String)> {
        match (&self.catalog.client_id, &self.catalog.client_secret) {
            (Some(id), Some(secret)) => Ok((id.clone(), secret.clone())),
            _ => Err(ConfigError::MissingCredentials.into()),
        }
    }

    /// AI provider API key, or an actionable error when unset
    pub fn ai_api_key(&self) -> Result<String> {
        self.ai
            .api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingAiApiKey.into())
    }

    /// Effective upstream timeout
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}
