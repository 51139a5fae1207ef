use std::collections::BTreeMap;
use std::fmt;

use activation_core::error::Result;
use activation_core::step::{StepData, WizardState, WizardStep};
use chrono::{DateTime, TimeDelta, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written by this build.
pub const CACHE_SCHEMA_VERSION: &str = "1.1.0";

/// The serialized wizard state as it sits in durable local storage.
///
/// `data` keys are step indices as strings (`"1"`..`"6"`), values are the
/// step shapes. `timestamp` is the write time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEnvelope {
    pub data: BTreeMap<String, Value>,
    pub current_step: i64,
    pub timestamp: i64,
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Why an envelope was not trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeRejection {
    /// Written longer ago than the cache TTL.
    Expired { age_ms: i64 },
    /// Written by a build with another schema version.
    SchemaMismatch { found: String },
    /// Written for a different user than the one hydrating.
    ForeignUser,
    /// Structurally invalid (bad step index, undecodable step data).
    Malformed(String),
}

impl fmt::Display for EnvelopeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeRejection::Expired { age_ms } => {
                write!(f, "expired ({} minutes old)", age_ms / 60_000)
            }
            EnvelopeRejection::SchemaMismatch { found } => {
                write!(f, "schema version mismatch (found '{}')", found)
            }
            EnvelopeRejection::ForeignUser => f.write_str("written for another user"),
            EnvelopeRejection::Malformed(reason) => write!(f, "malformed: {}", reason),
        }
    }
}

impl CacheEnvelope {
    /// Serializes the full wizard state into a fresh envelope.
    pub fn from_state(
        state: &WizardState,
        schema_version: &Version,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let mut data = BTreeMap::new();
        for (step, step_data) in &state.steps {
            data.insert(step.index().to_string(), step_data.to_json()?);
        }

        Ok(Self {
            data,
            current_step: i64::from(state.current_step.index()),
            timestamp: now.timestamp_millis(),
            schema_version: schema_version.to_string(),
            user_id: user_id.map(str::to_string),
        })
    }

    /// Validates the envelope and decodes it into a wizard state.
    ///
    /// All-or-nothing: any failing check rejects the whole envelope.
    pub fn into_state(
        self,
        expected_version: &Version,
        ttl: TimeDelta,
        user_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> std::result::Result<WizardState, EnvelopeRejection> {
        let version_matches = Version::parse(&self.schema_version)
            .map(|v| &v == expected_version)
            .unwrap_or(false);
        if !version_matches {
            return Err(EnvelopeRejection::SchemaMismatch {
                found: self.schema_version,
            });
        }

        let age_ms = now
            .timestamp_millis()
            .checked_sub(self.timestamp)
            .ok_or_else(|| EnvelopeRejection::Malformed(format!("timestamp {}", self.timestamp)))?;
        if age_ms > ttl.num_milliseconds() {
            return Err(EnvelopeRejection::Expired { age_ms });
        }

        if let (Some(owner), Some(current)) = (self.user_id.as_deref(), user_id)
            && owner != current
        {
            return Err(EnvelopeRejection::ForeignUser);
        }

        let current_step = u8::try_from(self.current_step)
            .ok()
            .and_then(WizardStep::from_index)
            .ok_or_else(|| {
                EnvelopeRejection::Malformed(format!("current step {}", self.current_step))
            })?;

        let mut state = WizardState {
            steps: BTreeMap::new(),
            current_step,
        };
        for (key, value) in self.data {
            let step = key
                .parse::<u8>()
                .ok()
                .and_then(WizardStep::from_index)
                .ok_or_else(|| EnvelopeRejection::Malformed(format!("step key '{}'", key)))?;
            let step_data = StepData::from_json(step, value)
                .map_err(|e| EnvelopeRejection::Malformed(format!("step {}: {}", key, e)))?;
            state.steps.insert(step, step_data);
        }

        Ok(state)
    }
}
