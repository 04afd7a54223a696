//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::watch;

use crate::document::{CollectionPath, DocPath, Document, FieldFilter, StoredDoc, WriteBatch};
use crate::error::{BlobError, RelayError, StoreError};
use crate::models::{RequestContext, UserId};

/// Hierarchical document persistence contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Allocates a fresh document id before the document exists.
    fn new_id(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }

    async fn get(&self, path: &DocPath) -> Result<Option<StoredDoc>, StoreError>;

    /// Creates or overwrites a document.
    async fn set(&self, path: &DocPath, fields: Document) -> Result<(), StoreError>;

    /// Merges `fields` into an existing document.
    async fn update(&self, path: &DocPath, fields: Document) -> Result<(), StoreError>;

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDoc>, StoreError>;

    /// Applies every operation in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Live view of a collection: the receiver holds the current documents
    /// and is refreshed after every committed change to the collection.
    /// Dropping the receiver unsubscribes.
    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<watch::Receiver<Vec<StoredDoc>>, StoreError>;
}

/// Key to bytes storage for word images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes bytes at `key`, overwriting any previous blob.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError>;

    /// Resolves the public download URL of the blob at `key`.
    async fn download_url(&self, key: &str) -> Result<String, BlobError>;

    /// Deletes the blob addressed by a download URL (or raw key).
    /// Must report `BlobError::NotFound` when nothing is stored there.
    async fn delete(&self, reference: &str) -> Result<(), BlobError>;
}

/// Server-side fetch of a third-party image, re-hosted in the blob store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FetchRelay: Send + Sync {
    /// Returns the download URL of the re-hosted copy of `image_url`.
    async fn upload_from_url(
        &self,
        ctx: &RequestContext,
        image_url: &str,
    ) -> Result<String, RelayError>;
}

/// Session contract: maps bearer tokens to the current user.
pub trait AuthProvider: Send + Sync {
    /// Issues a session token for a user authenticated elsewhere.
    fn issue(&self, user: &UserId) -> String;

    /// Resolves a token; `None` when it is malformed or forged.
    fn resolve(&self, token: &str) -> Option<UserId>;
}
