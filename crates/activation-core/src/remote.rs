//! Remote service contracts.
//!
//! These traits abstract the external activation service so the state
//! container can be driven by an HTTP client in production and by in-memory
//! fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{DocumentType, LocalFile};
use crate::error::Result;
use crate::profile::RemoteProfile;

/// Body of the profile-update endpoint: one step's data as a partial update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepUpdate {
    pub step: u8,
    pub data: Value,
}

/// Acknowledgement of one accepted document upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub document_type: DocumentType,
    pub message: Option<String>,
}

/// Read/write access to the remote profile.
#[async_trait]
pub trait ProfileGateway: Send + Sync {
    /// Fetches the current user's profile.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(profile))`: the service holds a profile
    /// - `Ok(None)`: no profile exists yet
    /// - `Err(_)`: transport failure or non-success status
    async fn fetch_profile(&self) -> Result<Option<RemoteProfile>>;

    /// Merges one step's data into the stored profile.
    async fn submit_step(&self, update: StepUpdate) -> Result<()>;
}

/// Multipart document upload.
#[async_trait]
pub trait DocumentUploader: Send + Sync {
    /// Uploads a single file under the given document type.
    ///
    /// Each call stands alone: its outcome says nothing about other uploads.
    async fn upload_document(
        &self,
        document_type: DocumentType,
        file: &LocalFile,
    ) -> Result<UploadReceipt>;
}
