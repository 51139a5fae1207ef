//! Data Transfer Objects (DTOs) for persistence.
//!
//! These DTOs are the serialized form of domain state. They are private to
//! the infrastructure layer.
//!
//! ## Cache schema versioning
//!
//! The cache envelope carries a semantic `schemaVersion`. Unlike long-lived
//! configuration files, cached wizard progress is never migrated: an
//! envelope written by any other schema version is discarded in full.
//!
//! ### Envelope Version History
//! - **1.0.0**: `data`, `currentStep`, `timestamp`, `schemaVersion`
//! - **1.1.0**: Added optional `userId` owner tag

mod envelope;

pub use envelope::{CACHE_SCHEMA_VERSION, CacheEnvelope, EnvelopeRejection};
