use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ActivationError;

/// One page of the six-page activation wizard.
///
/// Serialized as its 1-based index so that cache envelopes and remote
/// payloads carry plain numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WizardStep {
    #[default]
    Personal = 1,
    Family = 2,
    Employment = 3,
    Identity = 4,
    References = 5,
    Bank = 6,
}

impl WizardStep {
    /// All steps in wizard order.
    pub const ALL: [WizardStep; 6] = [
        WizardStep::Personal,
        WizardStep::Family,
        WizardStep::Employment,
        WizardStep::Identity,
        WizardStep::References,
        WizardStep::Bank,
    ];

    /// The 1-based index of this step.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Looks a step up by its 1-based index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index).checked_sub(1)?).copied()
    }

    /// Interprets a step number coming from an untrusted source.
    ///
    /// Out-of-range values are clamped to the first or last step; a missing
    /// value means the first step.
    pub fn from_stored(value: Option<i64>) -> Self {
        match value {
            Some(v) if v >= i64::from(WizardStep::Bank.index()) => WizardStep::Bank,
            Some(v) => u8::try_from(v)
                .ok()
                .and_then(Self::from_index)
                .unwrap_or_default(),
            None => WizardStep::Personal,
        }
    }

    /// Whether this step carries document attachments.
    pub fn carries_attachments(self) -> bool {
        matches!(self, WizardStep::Identity)
    }

    /// Short human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Personal => "personal",
            WizardStep::Family => "family",
            WizardStep::Employment => "employment",
            WizardStep::Identity => "identity",
            WizardStep::References => "references",
            WizardStep::Bank => "bank",
        }
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = ActivationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_index(value).ok_or(ActivationError::InvalidStep(i64::from(value)))
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.index()
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.label())
    }
}
