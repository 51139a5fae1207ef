//! Document upload side-channel.
//!
//! Each attached file becomes its own upload job. Uploads are independent of
//! each other and of the step write that carried them.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use activation_core::document::{DocumentField, DocumentType, LocalFile};
use activation_core::remote::DocumentUploader;
use uuid::Uuid;

use super::propagation::{JobKind, PropagationQueue};

/// Dispatches uploads and keeps the in-session ledger of accepted documents.
#[derive(Clone)]
pub struct UploadSideChannel {
    uploader: Arc<dyn DocumentUploader>,
    queue: PropagationQueue,
    uploaded: Arc<RwLock<BTreeSet<DocumentType>>>,
    /// Bumped by every ledger reset.
    epoch: Arc<AtomicU64>,
}

impl UploadSideChannel {
    pub fn new(uploader: Arc<dyn DocumentUploader>, queue: PropagationQueue) -> Self {
        Self {
            uploader,
            queue,
            uploaded: Arc::new(RwLock::new(BTreeSet::new())),
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queues one upload per attachment. Returns the job ids in input order.
    pub fn dispatch(&self, attachments: &[(DocumentField, LocalFile)]) -> Vec<Uuid> {
        let dispatched_at = self.epoch.load(Ordering::SeqCst);

        attachments
            .iter()
            .map(|(field, file)| {
                let document_type = field.document_type();
                let file = file.clone();
                let uploader = self.uploader.clone();
                let uploaded = self.uploaded.clone();
                let epoch = self.epoch.clone();
                let label = format!("{} <- {}", document_type, file.file_name());

                self.queue.spawn(JobKind::DocumentUpload, label, async move {
                    let receipt = uploader.upload_document(document_type, &file).await?;
                    tracing::info!(
                        "[UploadSideChannel] {} accepted{}",
                        receipt.document_type,
                        receipt
                            .message
                            .map(|m| format!(": {}", m))
                            .unwrap_or_default()
                    );
                    if epoch.load(Ordering::SeqCst) == dispatched_at {
                        uploaded
                            .write()
                            .unwrap_or_else(PoisonError::into_inner)
                            .insert(receipt.document_type);
                    }
                    Ok(())
                })
            })
            .collect()
    }

    /// Document types accepted by the service during this session.
    pub fn uploaded_documents(&self) -> Vec<DocumentType> {
        self.uploaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Empties the ledger. Uploads dispatched before the reset are not
    /// recorded when they finish.
    pub fn clear_ledger(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.uploaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
