//! Configuration loading.
//!
//! Reads `config.toml` from the activation config directory, falls back to
//! defaults when the file is missing, then applies environment overrides:
//!
//! - `ACTIVATION_API_URL` → `api.base_url`
//! - `ACTIVATION_API_TOKEN` → `api.bearer_token`
//! - `ACTIVATION_STORAGE_DIR` → `cache.storage_dir`

use std::path::{Path, PathBuf};

use activation_core::config::ActivationConfig;
use anyhow::{Context, Result};

use crate::paths::ActivationPaths;
use crate::storage::FileKeyValueStore;

pub const ENV_API_URL: &str = "ACTIVATION_API_URL";
pub const ENV_API_TOKEN: &str = "ACTIVATION_API_TOKEN";
pub const ENV_STORAGE_DIR: &str = "ACTIVATION_STORAGE_DIR";

/// Loads [`ActivationConfig`] and builds the stores it describes.
#[derive(Debug, Clone, Default)]
pub struct ConfigService {
    paths: ActivationPaths,
}

impl ConfigService {
    pub fn new(base_path: Option<&Path>) -> Self {
        Self {
            paths: ActivationPaths::new(base_path),
        }
    }

    /// Loads the config file plus process environment overrides.
    pub fn load(&self) -> Result<ActivationConfig> {
        let config_path = self.paths.config_file()?;
        let config = Self::load_file(&config_path)?;
        Ok(Self::apply_overrides(config, |name| std::env::var(name).ok()))
    }

    /// Parses a config file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<ActivationConfig> {
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] {} not found, using defaults",
                path.display()
            );
            return Ok(ActivationConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: ActivationConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::info!("[ConfigService] Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies environment overrides read through `lookup`.
    pub fn apply_overrides<F>(mut config: ActivationConfig, lookup: F) -> ActivationConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.trim().is_empty()) {
            config.api.bearer_token = Some(token);
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR).filter(|v| !v.trim().is_empty()) {
            config.cache.storage_dir = Some(PathBuf::from(dir));
        }
        config
    }

    /// Opens the file-backed store the config points at.
    pub fn open_store(&self, config: &ActivationConfig) -> Result<FileKeyValueStore> {
        let dir = match &config.cache.storage_dir {
            Some(dir) => dir.clone(),
            None => self.paths.storage_dir()?,
        };
        let store = FileKeyValueStore::new(&dir)
            .with_context(|| format!("Failed to open progress store at {}", dir.display()))?;
        Ok(store.with_quota(config.cache.quota_bytes))
    }
}
