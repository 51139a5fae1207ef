use std::collections::BTreeMap;

use super::id::WizardStep;
use super::model::StepData;
use crate::document::{DocumentField, LocalFile};
use crate::error::{ActivationError, Result};

/// The in-memory, authoritative wizard state.
///
/// `steps` is sparse: an entry exists only once the user saved that step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    pub steps: BTreeMap<WizardStep, StepData>,
    pub current_step: WizardStep,
}

impl WizardState {
    /// Creates an empty state positioned on the first step.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, step: WizardStep) -> Option<&StepData> {
        self.steps.get(&step)
    }

    /// Stores `data` under its own step, returning what it replaced.
    pub fn insert(&mut self, data: StepData) -> Option<StepData> {
        self.steps.insert(data.step(), data)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps with saved data, in wizard order.
    pub fn saved_steps(&self) -> Vec<WizardStep> {
        self.steps.keys().copied().collect()
    }

    /// Drops all step data and returns to the first step.
    pub fn reset(&mut self) {
        self.steps.clear();
        self.current_step = WizardStep::default();
    }
}

/// What a step form hands over on save.
///
/// Attachments are transient, session-scoped files; they never end up in
/// [`WizardState`]. Only the identity step accepts them.
#[derive(Debug, Clone)]
pub struct StepPayload {
    pub data: StepData,
    pub attachments: Vec<(DocumentField, LocalFile)>,
}

impl StepPayload {
    pub fn new(data: StepData) -> Self {
        Self {
            data,
            attachments: Vec::new(),
        }
    }

    /// Binds a local file to a document field. A later binding for the same
    /// field replaces the earlier one.
    pub fn with_attachment(mut self, field: DocumentField, file: LocalFile) -> Self {
        self.attachments.retain(|(f, _)| *f != field);
        self.attachments.push((field, file));
        self
    }

    /// Checks that this payload may be written to `step`.
    pub fn validate_for(&self, step: WizardStep) -> Result<()> {
        let own = self.data.step();
        if own != step {
            return Err(ActivationError::StepMismatch {
                step: step.index(),
                payload: own.index(),
            });
        }
        if !self.attachments.is_empty() && !step.carries_attachments() {
            return Err(ActivationError::UnexpectedAttachments(step.index()));
        }
        Ok(())
    }
}

impl From<StepData> for StepPayload {
    fn from(data: StepData) -> Self {
        Self::new(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::{BankDetails, IdentityInfo, PersonalInfo};

    #[test]
    fn test_insert_keys_by_own_step() {
        let mut state = WizardState::new();
        assert!(state.is_empty());
        assert_eq!(state.current_step, WizardStep::Personal);

        state.insert(StepData::Bank(BankDetails::default()));
        assert!(state.get(WizardStep::Bank).is_some());
        assert!(state.get(WizardStep::Personal).is_none());
        assert_eq!(state.saved_steps(), vec![WizardStep::Bank]);
    }

    #[test]
    fn test_reset() {
        let mut state = WizardState::new();
        state.insert(StepData::Personal(PersonalInfo::default()));
        state.current_step = WizardStep::Employment;

        state.reset();
        assert_eq!(state, WizardState::new());
    }

    #[test]
    fn test_validate_for_rejects_mismatch() {
        let payload = StepPayload::new(StepData::Bank(BankDetails::default()));
        assert!(payload.validate_for(WizardStep::Bank).is_ok());
        assert_eq!(
            payload.validate_for(WizardStep::Family),
            Err(ActivationError::StepMismatch {
                step: 2,
                payload: 6
            })
        );
    }

    #[test]
    fn test_attachments_only_on_identity_step() {
        let file = LocalFile::new("front.jpg", vec![1u8, 2, 3]);

        let identity = StepPayload::new(StepData::Identity(IdentityInfo::default()))
            .with_attachment(DocumentField::FrontImage, file.clone())
            .with_attachment(DocumentField::FrontImage, file.clone());
        assert_eq!(identity.attachments.len(), 1);
        assert!(identity.validate_for(WizardStep::Identity).is_ok());

        let bank = StepPayload::new(StepData::Bank(BankDetails::default()))
            .with_attachment(DocumentField::SelfieImage, file);
        assert_eq!(
            bank.validate_for(WizardStep::Bank),
            Err(ActivationError::UnexpectedAttachments(6))
        );
    }
}
