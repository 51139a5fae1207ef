//! Wizard step domain module.
//!
//! # Module Structure
//!
//! - `id`: the six step identifiers
//! - `model`: the per-step data shapes and the [`StepData`] sum type
//! - `state`: the in-memory wizard state and write payloads

mod id;
mod model;
mod state;

// Re-export public API
pub use id::WizardStep;
pub use model::{
    BankDetails, DateParts, EmploymentInfo, FamilyInfo, IdentityInfo, PersonalInfo, Reference,
    Relative, StepData,
};
pub use state::{StepPayload, WizardState};
