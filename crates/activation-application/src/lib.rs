//! Application layer: the activation state container and its background
//! propagation machinery.

pub mod activation;
pub mod logging;

pub use activation::{
    ActivationStateContainer, ErrorState, HydrationOutcome, JobKind, PropagationQueue,
    PropagationStats, StepWriteReport, UploadSideChannel, build_container,
};
