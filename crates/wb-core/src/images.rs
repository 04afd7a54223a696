//! # Image Attachment Manager
//!
//! Turns an [`ImageSource`] into a durable blob download URL and disposes of
//! superseded blobs. A word's `imageUrl` is the only record of which blob is
//! live; resolution always completes before the owning document changes.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::data_url::DataUrl;
use crate::error::{AppError, BlobError, Result};
use crate::models::{ImageSource, RequestContext, UserId, WordId};
use crate::paths;
use crate::traits::{BlobStore, FetchRelay};

#[derive(Clone)]
pub struct ImageAttachments {
    blobs: Arc<dyn BlobStore>,
    relay: Arc<dyn FetchRelay>,
}

impl ImageAttachments {
    pub fn new(blobs: Arc<dyn BlobStore>, relay: Arc<dyn FetchRelay>) -> Self {
        Self { blobs, relay }
    }

    /// Resolves `source` to the URL to store in the word's `imageUrl`.
    ///
    /// Returns an empty string when there is no image. File uploads land at
    /// `wordImages/{user}/{word}`, overwriting earlier uploads for the word;
    /// remote URLs go through the relay, which picks its own key.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        word_id: &WordId,
        source: &ImageSource,
    ) -> Result<String> {
        let user = ctx.user_id()?;
        if source.is_empty() {
            return Ok(String::new());
        }

        match source {
            ImageSource::None => Ok(String::new()),
            ImageSource::FileBytes(data_url) => self.upload_file(user, word_id, data_url).await,
            ImageSource::RemoteUrl(url) => {
                let url = self.relay.upload_from_url(ctx, url.trim()).await?;
                debug!(user = %user, word = %word_id, "remote image re-hosted by relay");
                Ok(url)
            }
        }
    }

    async fn upload_file(&self, user: &UserId, word_id: &WordId, data_url: &str) -> Result<String> {
        let image = DataUrl::parse(data_url)?;
        let key = paths::word_image_key(user, word_id);
        let size = image.data.len();

        self.blobs
            .put(&key, image.data, &image.content_type)
            .await
            .map_err(|e| upload_failed(&key, e))?;
        let url = self
            .blobs
            .download_url(&key)
            .await
            .map_err(|e| upload_failed(&key, e))?;

        info!(%key, size, "word image uploaded");
        Ok(url)
    }

    /// Deletes the blob behind `image_url`.
    ///
    /// A blob that is already gone counts as deleted, so releasing twice is
    /// fine. Any other failure comes back as `StorageInconsistency`.
    /// References outside the caller's image folder are never deleted.
    pub async fn release(&self, ctx: &RequestContext, image_url: &str) -> Result<()> {
        let user = ctx.user_id()?;
        if image_url.is_empty() {
            return Ok(());
        }
        if !owned_by(user, image_url) {
            warn!(user = %user, image_url, "image outside the caller's folder; left in place");
            return Ok(());
        }

        match self.blobs.delete(image_url).await {
            Ok(()) => {
                debug!(image_url, "word image deleted");
                Ok(())
            }
            Err(BlobError::NotFound(_)) => {
                debug!(image_url, "word image already absent");
                Ok(())
            }
            Err(e) => Err(AppError::StorageInconsistency(format!(
                "failed to delete image {image_url}: {e}"
            ))),
        }
    }

    /// [`release`](Self::release) for callers whose own operation must not be
    /// blocked by the blob store: failures are logged and dropped.
    pub(crate) async fn release_quietly(&self, ctx: &RequestContext, image_url: &str) {
        if let Err(e) = self.release(ctx, image_url).await {
            warn!(image_url, error = %e, "image release failed; continuing");
        }
    }
}

/// True when the first `wordImages/` segment of `image_url` is the user's own
/// folder and the reference cannot climb out of it.
fn owned_by(user: &UserId, image_url: &str) -> bool {
    let own_dir = format!("{}/", paths::relay_image_dir(user));
    let Some(at) = image_url.find(&format!("{}/", paths::WORD_IMAGES)) else {
        return false;
    };
    image_url[at..].starts_with(&own_dir) && !image_url.contains("..")
}

fn upload_failed(key: &str, err: BlobError) -> AppError {
    match err {
        BlobError::InvalidData(msg) => AppError::ValidationError(msg),
        other => AppError::Internal(format!("image upload to {key} failed: {other}")),
    }
}
