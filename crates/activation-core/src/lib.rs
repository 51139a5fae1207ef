//! Domain model for the activation wizard.
//!
//! This crate holds the step shapes, the in-memory wizard state, the remote
//! profile record and the traits the infrastructure layer implements. It
//! performs no I/O apart from reading local files into transient attachments.

pub mod config;
pub mod document;
pub mod error;
pub mod profile;
pub mod remote;
pub mod step;
pub mod storage;
pub mod user;

// Re-export common error type
pub use error::{ActivationError, Result, StorageError};

pub use document::{DocumentField, DocumentType, LocalFile};
pub use profile::RemoteProfile;
pub use step::{StepData, StepPayload, WizardState, WizardStep};
pub use user::UserIdentity;
