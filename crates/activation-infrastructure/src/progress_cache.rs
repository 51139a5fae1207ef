//! Local durable cache of wizard progress.
//!
//! Holds one envelope in one key of a [`KeyValueStore`]. Every write
//! serializes the full state, so the slot is last-write-wins.

use std::sync::Arc;

use activation_core::config::CacheSettings;
use activation_core::error::{ActivationError, Result};
use activation_core::step::WizardState;
use activation_core::storage::KeyValueStore;
use chrono::{DateTime, TimeDelta, Utc};
use semver::Version;

use crate::dto::{CACHE_SCHEMA_VERSION, CacheEnvelope, EnvelopeRejection};

/// Outcome of reading the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLoad {
    /// A valid envelope was found and decoded.
    Restored(WizardState),
    /// Nothing is stored under the key.
    Absent,
    /// An envelope was found but not trusted; it has been deleted.
    Discarded(EnvelopeRejection),
}

/// Outcome of a successful cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWrite {
    /// Written on the first attempt.
    Written,
    /// The first attempt hit the quota; the old envelope was evicted and the
    /// retry succeeded.
    WrittenAfterEviction,
}

/// The wizard's local durable cache.
pub struct ProgressCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ttl: TimeDelta,
    schema_version: Version,
}

impl ProgressCache {
    /// Creates a cache over `store` using the key and TTL from `settings`.
    pub fn new(store: Arc<dyn KeyValueStore>, settings: &CacheSettings) -> Result<Self> {
        let schema_version = Version::parse(CACHE_SCHEMA_VERSION).map_err(|e| {
            ActivationError::internal(format!("Invalid cache schema version: {}", e))
        })?;
        let ttl_hours = i64::try_from(settings.ttl_hours)
            .map_err(|_| ActivationError::config("cache.ttl_hours is too large"))?;
        let ttl = TimeDelta::try_hours(ttl_hours)
            .ok_or_else(|| ActivationError::config("cache.ttl_hours is too large"))?;

        Ok(Self {
            store,
            key: settings.key.clone(),
            ttl,
            schema_version,
        })
    }

    /// Overrides the schema version this cache reads and writes.
    pub fn with_schema_version(mut self, schema_version: Version) -> Self {
        self.schema_version = schema_version;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema_version(&self) -> &Version {
        &self.schema_version
    }

    /// Reads and validates the envelope for `user_id`.
    ///
    /// Untrusted envelopes are deleted. Only a failing store read is an error.
    pub fn load(&self, user_id: Option<&str>) -> Result<CacheLoad> {
        self.load_at(user_id, Utc::now())
    }

    pub fn load_at(&self, user_id: Option<&str>, now: DateTime<Utc>) -> Result<CacheLoad> {
        let Some(raw) = self.store.get_item(&self.key)? else {
            tracing::debug!("[ProgressCache] No envelope under '{}'", self.key);
            return Ok(CacheLoad::Absent);
        };

        let decoded = serde_json::from_str::<CacheEnvelope>(&raw)
            .map_err(|e| EnvelopeRejection::Malformed(e.to_string()))
            .and_then(|envelope| {
                envelope.into_state(&self.schema_version, self.ttl, user_id, now)
            });

        match decoded {
            Ok(state) => {
                tracing::debug!(
                    "[ProgressCache] Restored {} step(s), current step {}",
                    state.steps.len(),
                    state.current_step
                );
                Ok(CacheLoad::Restored(state))
            }
            Err(rejection) => {
                tracing::info!("[ProgressCache] Discarding envelope: {}", rejection);
                if let Err(e) = self.store.remove_item(&self.key) {
                    tracing::warn!("[ProgressCache] Failed to delete rejected envelope: {}", e);
                }
                Ok(CacheLoad::Discarded(rejection))
            }
        }
    }

    /// Writes the full state as a fresh envelope.
    ///
    /// On quota exhaustion the existing envelope is deleted and the write is
    /// retried once. A second failure is returned to the caller.
    pub fn save(&self, state: &WizardState, user_id: Option<&str>) -> Result<CacheWrite> {
        self.save_at(state, user_id, Utc::now())
    }

    pub fn save_at(
        &self,
        state: &WizardState,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CacheWrite> {
        let envelope = CacheEnvelope::from_state(state, &self.schema_version, user_id, now)?;
        let json = serde_json::to_string(&envelope)?;

        match self.store.set_item(&self.key, &json) {
            Ok(()) => Ok(CacheWrite::Written),
            Err(e) if e.is_quota_exceeded() => {
                tracing::warn!(
                    "[ProgressCache] Quota exceeded writing {} bytes; evicting '{}' and retrying",
                    json.len(),
                    self.key
                );
                if let Err(e) = self.store.remove_item(&self.key) {
                    tracing::warn!("[ProgressCache] Eviction failed: {}", e);
                }
                self.store.set_item(&self.key, &json).map_err(|e| {
                    tracing::error!("[ProgressCache] Retry after eviction failed: {}", e);
                    ActivationError::from(e)
                })?;
                Ok(CacheWrite::WrittenAfterEviction)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the envelope.
    pub fn clear(&self) -> Result<()> {
        self.store.remove_item(&self.key)?;
        tracing::debug!("[ProgressCache] Cleared '{}'", self.key);
        Ok(())
    }
}
