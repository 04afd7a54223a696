//! Shared fixtures: in-memory backends, a deterministic relay and a blob
//! store whose deletes can be made to fail.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use wb_core::paths;
use wb_core::{
    Backends, BlobError, BlobStore, FetchRelay, Language, ListId, RelayError, RequestContext,
    UserId, Vocabulary, WordDraft, WordId,
};
use wb_store_memory::{MemoryBlobStore, MemoryDocumentStore};

/// An 8-byte PNG signature, enough for the in-memory blob store.
pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgo=";
const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0stub";

pub fn user() -> RequestContext {
    RequestContext::authenticated(UserId::from("u1"))
}

pub fn u1() -> UserId {
    UserId::from("u1")
}

/// Behaves like the deployed relay: authenticated callers only, a
/// non-empty URL, and any URL containing `404` is unreachable.
pub struct StubRelay {
    blobs: Arc<dyn BlobStore>,
    fetched: AtomicUsize,
}

impl StubRelay {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            fetched: AtomicUsize::new(0),
        }
    }

    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchRelay for StubRelay {
    async fn upload_from_url(
        &self,
        ctx: &RequestContext,
        image_url: &str,
    ) -> Result<String, RelayError> {
        let user = ctx.user().ok_or(RelayError::Unauthenticated)?;
        if image_url.trim().is_empty() {
            return Err(RelayError::InvalidArgument(
                "an 'imageUrl' argument is required".into(),
            ));
        }
        if image_url.contains("404") {
            return Err(RelayError::Upstream(image_url.to_owned()));
        }

        let n = self.fetched.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}/relay_{n}.jpg", paths::relay_image_dir(user));
        self.blobs
            .put(&key, Bytes::from_static(JPEG_BYTES), "image/jpeg")
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))?;
        self.blobs
            .download_url(&key)
            .await
            .map_err(|e| RelayError::Internal(e.to_string()))
    }
}

/// Pass-through blob store that counts deletes and can fail them.
pub struct FlakyBlobStore {
    inner: Arc<MemoryBlobStore>,
    fail_deletes: AtomicBool,
    deletes: AtomicUsize,
}

impl FlakyBlobStore {
    pub fn new(inner: Arc<MemoryBlobStore>) -> Self {
        Self {
            inner,
            fail_deletes: AtomicBool::new(false),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.inner.put(key, data, content_type).await
    }

    async fn download_url(&self, key: &str) -> Result<String, BlobError> {
        self.inner.download_url(key).await
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Backend(anyhow::anyhow!("blob service unavailable")));
        }
        self.inner.delete(reference).await
    }
}

pub struct Harness {
    pub docs: Arc<MemoryDocumentStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub flaky: Arc<FlakyBlobStore>,
    pub relay: Arc<StubRelay>,
    pub vocab: Vocabulary,
}

impl Harness {
    pub fn new() -> Self {
        let docs = Arc::new(MemoryDocumentStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let flaky = Arc::new(FlakyBlobStore::new(blobs.clone()));
        let relay = Arc::new(StubRelay::new(blobs.clone()));
        let vocab = Vocabulary::new(Backends {
            docs: docs.clone(),
            blobs: flaky.clone(),
            relay: relay.clone(),
        });
        Self {
            docs,
            blobs,
            flaky,
            relay,
            vocab,
        }
    }

    pub async fn list(&self, name: &str) -> ListId {
        self.vocab
            .lists
            .create_list(&user(), name, Language::Japanese)
            .await
            .expect("Failed to create list")
    }

    pub async fn word(&self, list_id: &ListId, draft: WordDraft) -> WordId {
        self.vocab
            .words
            .add_word(&user(), list_id, draft)
            .await
            .expect("Failed to add word")
    }

    /// The download URL the blob store issues for a file upload of `word`.
    pub fn file_image_url(&self, word: &WordId) -> String {
        format!("memory://blobs/{}", paths::word_image_key(&u1(), word))
    }
}
