//! Configuration for the activation subsystem.
//!
//! Every field has a default so a partial (or missing) config file works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const DEFAULT_CACHE_KEY: &str = "activation_progress";
pub const DEFAULT_CACHE_TTL_HOURS: u64 = 24;

/// Root configuration.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ActivationConfig {
    pub api: ApiSettings,
    pub cache: CacheSettings,
}

/// Remote service settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub profile_path: String,
    pub update_path: String,
    pub upload_path: String,
    /// Sent as `Authorization: Bearer <token>` when present. Cookies
    /// returned by the service are always kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    /// Per-request timeout. `None` leaves requests unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            profile_path: "/api/activation/profile".to_string(),
            update_path: "/api/activation/update".to_string(),
            upload_path: "/api/activation/upload-document".to_string(),
            bearer_token: None,
            request_timeout_secs: None,
        }
    }
}

/// Local durable cache settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheSettings {
    /// The single storage slot the wizard state lives in.
    pub key: String,
    /// Envelopes older than this are discarded.
    pub ttl_hours: u64,
    /// Directory of the file-backed store. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
    /// Total bytes the store may hold. `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_bytes: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_CACHE_KEY.to_string(),
            ttl_hours: DEFAULT_CACHE_TTL_HOURS,
            storage_dir: None,
            quota_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ActivationConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://lend.example.com"

            [cache]
            quota_bytes = 5242880
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://lend.example.com");
        assert_eq!(config.api.profile_path, "/api/activation/profile");
        assert_eq!(config.cache.key, DEFAULT_CACHE_KEY);
        assert_eq!(config.cache.ttl_hours, 24);
        assert_eq!(config.cache.quota_bytes, Some(5_242_880));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: ActivationConfig = toml::from_str("").unwrap();
        assert_eq!(config, ActivationConfig::default());
    }
}
