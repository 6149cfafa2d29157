//! Media upload boundary.
//!
//! The protocol never stores media bytes. An uploader takes a blob and
//! returns an opaque reference, which is all a post records.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use weft_crypto::ContentAddresser;

use crate::error::{SdkError, SdkResult};

/// Reference prefix for content-addressed media.
pub const MEDIA_SCHEME: &str = "media:";

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Store `blob` somewhere and return a reference to it.
    async fn upload(&self, blob: Bytes) -> SdkResult<String>;
}

/// Keeps blobs in process memory under content-addressed references.
#[derive(Debug, Default)]
pub struct InMemoryMediaUploader {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryMediaUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference a blob would be stored under.
    pub fn reference_for(blob: &[u8]) -> String {
        format!(
            "{MEDIA_SCHEME}{}",
            hex::encode(ContentAddresser::MEDIA.hash(blob))
        )
    }

    pub fn get(&self, reference: &str) -> Option<Bytes> {
        self.blobs
            .read()
            .expect("lock poisoned")
            .get(reference)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MediaUploader for InMemoryMediaUploader {
    async fn upload(&self, blob: Bytes) -> SdkResult<String> {
        if blob.is_empty() {
            return Err(SdkError::Media("empty blob".into()));
        }
        let reference = Self::reference_for(&blob);
        debug!(%reference, size = blob.len(), "media stored");
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(reference.clone(), blob);
        Ok(reference)
    }
}
