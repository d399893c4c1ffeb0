//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URL, request timeout and the credential
//! backend used to hold the session token.
//!
//! Configuration is stored at `~/.config/hiva/config.json`. The
//! `HIVA_API_BASE_URL` and `HIVA_API_TIMEOUT_SECS` environment variables
//! override the file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::ApiConfig;
use crate::auth::{CredentialProvider, FileStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "hiva";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Hosted billing service used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://billingservice-wq93.onrender.com/api/";

/// Request timeout in seconds.
/// The hosted service cold-starts slowly, so the budget is generous.
pub const DEFAULT_TIMEOUT_SECS: u64 = 100;

/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "HIVA_API_BASE_URL";

/// Environment variable overriding the timeout
pub const TIMEOUT_ENV: &str = "HIVA_API_TIMEOUT_SECS";

/// Where the session token is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// OS keychain
    #[default]
    Keyring,
    /// `session.json` in the cache directory
    File,
    /// Process memory only
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub credential_backend: CredentialBackend,
    /// Phone number invoices are shared to
    pub share_phone: Option<String>,
    /// Origin of the web front-end used in shared invoice links
    pub app_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
            share_phone: None,
            app_origin: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load the config file alone, as it would be saved back.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Parse a config file body. A zero timeout would fail every request,
    /// so it falls back to the default.
    pub fn from_json(contents: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(contents).context("Failed to parse config file")?;
        if config.timeout_secs == 0 {
            warn!("Ignoring timeout_secs = 0 in config file");
            config.timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        Ok(config)
    }

    /// Change one setting by its command line name.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "base-url" => {
                if value.is_empty() {
                    anyhow::bail!("base-url must not be empty");
                }
                self.base_url = value.to_string();
            }
            "timeout-secs" => {
                self.timeout_secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| anyhow::anyhow!("timeout-secs must be a positive number"))?;
            }
            "credential-backend" => {
                let raw = serde_json::Value::String(value.to_lowercase());
                self.credential_backend = serde_json::from_value(raw).map_err(|_| {
                    anyhow::anyhow!("credential-backend must be keyring, file or memory")
                })?;
            }
            "share-phone" => self.share_phone = optional(value),
            "app-origin" => self.app_origin = optional(value),
            other => anyhow::bail!(
                "Unknown setting {:?} (expected base-url, timeout-secs, credential-backend, share-phone or app-origin)",
                other
            ),
        }
        Ok(())
    }

    /// Write the config file, returning where it went.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(path)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %raw, "Ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Settings for the HTTP client wrapper.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url).with_timeout(self.timeout())
    }

    /// Build the configured token store.
    pub fn credentials(&self) -> Result<Arc<dyn CredentialProvider>> {
        let provider: Arc<dyn CredentialProvider> = match self.credential_backend {
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::File => Arc::new(FileStore::new(self.cache_dir()?)),
            CredentialBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(provider)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
