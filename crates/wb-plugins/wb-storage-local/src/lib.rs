//! # wb-storage-local
//! wordbook/crates/wb-plugins/wb-storage-local/src/lib.rs
//! Local filesystem implementation of `BlobStore`.
//! Blob keys map one-to-one onto files under the root directory, so a second
//! upload for the same key replaces the first.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use wb_core::{BlobError, BlobStore};

pub struct LocalBlobStore {
    /// Root directory for all blobs (e.g., "./data/blobs")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/blobs")
    url_prefix: String,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        let url_prefix = url_prefix.into().trim_end_matches('/').to_owned();
        Self {
            root_path: root,
            url_prefix,
        }
    }

    /// Maps a key like `wordImages/u1/w1` onto a file below the root.
    /// Keys that could escape the root are rejected.
    fn blob_path(&self, key: &str) -> Result<PathBuf, BlobError> {
        let mut path = self.root_path.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
                return Err(BlobError::InvalidData(format!("invalid blob key: {key}")));
            }
            path.push(segment);
        }
        Ok(path)
    }

    /// Accepts either a download URL issued by this store or a raw key.
    fn key_of<'a>(&self, reference: &'a str) -> &'a str {
        reference
            .strip_prefix(self.url_prefix.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(reference)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    /// Only image payloads are accepted; the declared content type must
    /// agree with the sniffed format family.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        let format = image::guess_format(&data)
            .map_err(|_| BlobError::InvalidData(format!("{key}: not a recognised image")))?;
        if !content_type.starts_with("image/") {
            return Err(BlobError::InvalidData(format!(
                "{key}: content type {content_type} is not an image"
            )));
        }

        let target_path = self.blob_path(key)?;
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target_path, &data)
            .await
            .with_context(|| format!("failed to write {}", target_path.display()))?;

        debug!(key, size = data.len(), format = format.to_mime_type(), "blob stored");
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, BlobError> {
        let path = self.blob_path(key)?;
        match fs::try_exists(&path).await {
            Ok(true) => Ok(format!("{}/{}", self.url_prefix, key)),
            Ok(false) => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to stat {}", path.display()))
                .into()),
        }
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let key = self.key_of(reference);
        let path = self.blob_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobError::NotFound(key.to_owned())),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to delete {}", path.display()))
                .into()),
        }
    }
}
