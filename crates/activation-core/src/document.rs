//! Document attachments for the identity step.
//!
//! Files bound in the browser-equivalent of a file input live only for the
//! current session. They are uploaded through their own side-channel and are
//! never serialized into step data or the local cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ActivationError, Result};

/// A file-bearing field on the identity step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentField {
    FrontImage,
    BackImage,
    SelfieImage,
    ProofOfAddress,
}

impl DocumentField {
    pub const ALL: [DocumentField; 4] = [
        DocumentField::FrontImage,
        DocumentField::BackImage,
        DocumentField::SelfieImage,
        DocumentField::ProofOfAddress,
    ];

    /// The fixed document-type tag this field uploads under.
    pub fn document_type(self) -> DocumentType {
        match self {
            DocumentField::FrontImage => DocumentType::IdFront,
            DocumentField::BackImage => DocumentType::IdBack,
            DocumentField::SelfieImage => DocumentType::Selfie,
            DocumentField::ProofOfAddress => DocumentType::ProofOfAddress,
        }
    }

    /// Form field name.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentField::FrontImage => "frontImage",
            DocumentField::BackImage => "backImage",
            DocumentField::SelfieImage => "selfieImage",
            DocumentField::ProofOfAddress => "proofOfAddress",
        }
    }
}

/// Document-type tag understood by the upload endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    IdFront,
    IdBack,
    Selfie,
    ProofOfAddress,
}

impl DocumentType {
    pub fn as_tag(self) -> &'static str {
        match self {
            DocumentType::IdFront => "id_front",
            DocumentType::IdBack => "id_back",
            DocumentType::Selfie => "selfie",
            DocumentType::ProofOfAddress => "proof_of_address",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A file bound during the current session.
///
/// Deliberately neither `Serialize` nor `Deserialize`: it cannot cross the
/// persistence boundary. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalFile {
    file_name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl LocalFile {
    /// Wraps in-memory bytes, guessing the content type from the file name.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string();
        Self {
            file_name,
            content_type,
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Reads a file from disk.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ActivationError::Io {
                message: format!("Path has no file name: {}", path.display()),
            })?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, bytes))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
