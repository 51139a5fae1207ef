//! Shared fakes for the activation integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use activation_application::ActivationStateContainer;
use activation_core::config::CacheSettings;
use activation_core::document::{DocumentType, LocalFile};
use activation_core::error::{ActivationError, Result};
use activation_core::profile::RemoteProfile;
use activation_core::remote::{DocumentUploader, ProfileGateway, StepUpdate, UploadReceipt};
use activation_core::storage::KeyValueStore;
use activation_core::user::UserIdentity;
use activation_infrastructure::{MemoryKeyValueStore, ProgressCache};
use async_trait::async_trait;
use tokio::sync::Notify;

pub const CACHE_KEY: &str = activation_core::config::DEFAULT_CACHE_KEY;

/// What the fake service answers to a profile read.
#[derive(Debug, Clone)]
pub enum ProfileResponse {
    Profile(RemoteProfile),
    NoProfile,
    Unavailable,
    Panic,
}

/// In-memory stand-in for the remote profile endpoints.
pub struct FakeGateway {
    response: Mutex<ProfileResponse>,
    submitted: Mutex<Vec<StepUpdate>>,
    fetches: AtomicUsize,
    fail_submits: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl FakeGateway {
    pub fn new(response: ProfileResponse) -> Arc<Self> {
        Arc::new(Self {
            response: Mutex::new(response),
            submitted: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
            fail_submits: AtomicBool::new(false),
            gate: Mutex::new(None),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Self::new(ProfileResponse::Unavailable)
    }

    pub fn set_response(&self, response: ProfileResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn fail_submits(&self, fail: bool) {
        self.fail_submits.store(fail, Ordering::SeqCst);
    }

    /// Makes profile reads wait until the returned notify fires.
    pub fn hold_fetches(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn release_fetches(&self) {
        *self.gate.lock().unwrap() = None;
    }

    pub fn submitted(&self) -> Vec<StepUpdate> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileGateway for FakeGateway {
    async fn fetch_profile(&self) -> Result<Option<RemoteProfile>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // The answer is fixed when the request is made, not when it returns
        let response = self.response.lock().unwrap().clone();
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match response {
            ProfileResponse::Profile(profile) => Ok(Some(profile)),
            ProfileResponse::NoProfile => Ok(None),
            ProfileResponse::Unavailable => Err(ActivationError::remote("connection refused")),
            ProfileResponse::Panic => panic!("gateway exploded"),
        }
    }

    async fn submit_step(&self, update: StepUpdate) -> Result<()> {
        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(ActivationError::remote_status(503, "service unavailable"));
        }
        self.submitted.lock().unwrap().push(update);
        Ok(())
    }
}

/// Upload endpoint fake that rejects a configurable set of document types.
#[derive(Default)]
pub struct FakeUploader {
    rejected: Mutex<HashSet<DocumentType>>,
    received: Mutex<Vec<(DocumentType, String)>>,
}

impl FakeUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reject(&self, document_type: DocumentType) {
        self.rejected.lock().unwrap().insert(document_type);
    }

    pub fn received(&self) -> Vec<(DocumentType, String)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentUploader for FakeUploader {
    async fn upload_document(
        &self,
        document_type: DocumentType,
        file: &LocalFile,
    ) -> Result<UploadReceipt> {
        self.received
            .lock()
            .unwrap()
            .push((document_type, file.file_name().to_string()));
        if self.rejected.lock().unwrap().contains(&document_type) {
            return Err(ActivationError::remote_status(422, "document rejected"));
        }
        Ok(UploadReceipt {
            document_type,
            message: Some("stored".to_string()),
        })
    }
}

pub fn user(id: &str) -> UserIdentity {
    UserIdentity::new(id).with_email(format!("{}@example.com", id))
}

pub fn cache_over(store: Arc<dyn KeyValueStore>) -> ProgressCache {
    ProgressCache::new(store, &CacheSettings::default()).unwrap()
}

/// A container over `store`, as if the app was (re)started.
pub fn container_over(
    store: Arc<dyn KeyValueStore>,
    gateway: Arc<FakeGateway>,
    uploader: Arc<FakeUploader>,
) -> ActivationStateContainer {
    ActivationStateContainer::new(gateway, uploader, cache_over(store)).unwrap()
}

pub fn memory_store() -> Arc<MemoryKeyValueStore> {
    Arc::new(MemoryKeyValueStore::new())
}
