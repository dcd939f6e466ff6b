//! Application configuration management.
//!
//! Holds the backend URL, request timeout, last used phone number and the
//! choice of session storage backend.
//!
//! Configuration is stored at `~/.config/storedesk/config.json`. The
//! `STOREDESK_API_URL` and `STOREDESK_PHONE` environment variables override
//! the stored values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{ApiClientConfig, DEFAULT_BASE_URL};
use crate::auth::{EncryptedFileStorage, FileStorage, MemoryStorage, SessionStorage};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "storedesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "STOREDESK_API_URL";
pub const ENV_PHONE: &str = "STOREDESK_PHONE";
pub const ENV_PASSWORD: &str = "STOREDESK_PASSWORD";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the session is persisted between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    /// Plain JSON in the cache directory
    File,
    /// Encrypted file keyed by a secret in the OS keyring
    #[default]
    Encrypted,
    /// Nothing persisted; the session ends with the process
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub last_phone: Option<String>,
    pub session_backend: SessionBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            last_phone: None,
            session_backend: SessionBackend::default(),
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Override values from the environment. `lookup` returns a variable's value.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(phone) = lookup(ENV_PHONE).filter(|v| !v.trim().is_empty()) {
            self.last_phone = Some(phone.trim().to_string());
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs.max(1)),
        }
    }

    /// Build the storage backend selected by `session_backend`.
    pub fn session_storage(&self) -> Result<Box<dyn SessionStorage>> {
        match self.session_backend {
            SessionBackend::Memory => Ok(Box::new(MemoryStorage::default())),
            _ => Ok(self.session_storage_in(&self.cache_dir()?)),
        }
    }

    /// Storage backend rooted at `cache_dir`.
    ///
    /// The encrypted file needs a secret the OS keychain actually keeps;
    /// without one the session goes to the plain JSON file instead.
    pub fn session_storage_in(&self, cache_dir: &Path) -> Box<dyn SessionStorage> {
        match self.session_backend {
            SessionBackend::Memory => Box::new(MemoryStorage::default()),
            SessionBackend::File => Box::new(FileStorage::new(cache_dir)),
            SessionBackend::Encrypted => match EncryptedFileStorage::with_keyring(cache_dir) {
                Ok(vault) => Box::new(vault),
                Err(e) => {
                    warn!(error = %e, "Keychain unavailable, storing session unencrypted");
                    Box::new(FileStorage::new(cache_dir))
                }
            },
        }
    }
}
