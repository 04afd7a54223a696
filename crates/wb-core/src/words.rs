//! # Word Store
//!
//! Create/update/delete of words nested under a list. Image resolution is
//! always finished before the word document is written, so a failed upload or
//! relay call leaves no partial word behind.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::document::{to_document, Document, StoredDoc, WriteBatch};
use crate::error::{AppError, Result, StoreError};
use crate::feed::WordFeed;
use crate::images::ImageAttachments;
use crate::models::{ImageSource, ListId, RequestContext, UserId, Word, WordId};
use crate::paths;
use crate::traits::DocumentStore;

/// User input for adding or editing a word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDraft {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub part_of_speech: Option<String>,
    #[serde(default)]
    pub image: ImageSource,
}

impl WordDraft {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            meaning: meaning.into(),
            ..Self::default()
        }
    }

    pub fn part_of_speech(mut self, part_of_speech: impl Into<String>) -> Self {
        self.part_of_speech = Some(part_of_speech.into());
        self
    }

    pub fn image(mut self, image: ImageSource) -> Self {
        self.image = image;
        self
    }

    /// Trims the text fields; word and meaning must be non-blank.
    fn validated(self) -> Result<Self> {
        let word = self.word.trim().to_owned();
        let meaning = self.meaning.trim().to_owned();
        if word.is_empty() || meaning.is_empty() {
            return Err(AppError::ValidationError(
                "word and meaning are both required".into(),
            ));
        }
        let part_of_speech = self
            .part_of_speech
            .map(|p| p.trim().to_owned())
            .filter(|p| !p.is_empty());

        Ok(Self {
            word,
            meaning,
            part_of_speech,
            image: self.image,
        })
    }
}

#[derive(Clone)]
pub struct WordStore {
    docs: Arc<dyn DocumentStore>,
    images: ImageAttachments,
}

impl WordStore {
    pub fn new(docs: Arc<dyn DocumentStore>, images: ImageAttachments) -> Self {
        Self { docs, images }
    }

    /// Adds a word and returns its generated id.
    pub async fn add_word(
        &self,
        ctx: &RequestContext,
        list_id: &ListId,
        draft: WordDraft,
    ) -> Result<WordId> {
        let user = ctx.user_id()?;
        let draft = draft.validated()?;
        self.ensure_list(user, list_id).await?;

        // The id is needed up front: file uploads are keyed by it.
        let word_id = WordId::new(self.docs.new_id());
        let image_url = self.images.resolve(ctx, &word_id, &draft.image).await?;

        let now = Utc::now();
        let word = Word {
            id: word_id.clone(),
            word: draft.word,
            meaning: draft.meaning,
            part_of_speech: draft.part_of_speech,
            image_url,
            created_at: now,
            updated_at: Some(now),
        };
        let path = paths::word(user, list_id, &word_id);
        if let Err(e) = self.docs.set(&path, to_document(&word)?).await {
            if word.has_image() {
                warn!(%path, image_url = %word.image_url, "word write failed after image upload; blob left orphaned");
            }
            return Err(e.into());
        }

        info!(user = %user, list = %list_id, word = %word_id, "word added");
        Ok(word_id)
    }

    /// Edits a word in place; its id never changes.
    ///
    /// `original_image_url` is the `imageUrl` the client loaded before
    /// editing. An image input equal to it (or to the stored value) keeps the
    /// stored image with no blob work. Otherwise the new source is validated,
    /// the stored blob is released, and the new source is resolved.
    pub async fn update_word(
        &self,
        ctx: &RequestContext,
        list_id: &ListId,
        word_id: &WordId,
        draft: WordDraft,
        original_image_url: &str,
    ) -> Result<()> {
        let user = ctx.user_id()?;
        let draft = draft.validated()?;
        let path = paths::word(user, list_id, word_id);
        let stored: Word = self
            .docs
            .get(&path)
            .await?
            .ok_or_else(|| word_not_found(word_id))?
            .decode()?;

        let requested = draft.image.as_str();
        let image_url = if requested == original_image_url || requested == stored.image_url {
            stored.image_url
        } else {
            draft.image.validate()?;
            self.images.release_quietly(ctx, &stored.image_url).await;
            self.images.resolve(ctx, word_id, &draft.image).await?
        };

        let mut fields = Document::new();
        fields.insert("word".into(), Value::String(draft.word));
        fields.insert("meaning".into(), Value::String(draft.meaning));
        fields.insert(
            "partOfSpeech".into(),
            draft.part_of_speech.map_or(Value::Null, Value::String),
        );
        fields.insert("imageUrl".into(), Value::String(image_url));
        fields.insert("updatedAt".into(), serde_json::to_value(Utc::now())?);

        self.docs
            .update(&path, fields)
            .await
            .map_err(|e| not_found_as(e, || word_not_found(word_id)))?;

        info!(user = %user, list = %list_id, word = %word_id, "word updated");
        Ok(())
    }

    /// Deletes a word, releasing its image first.
    pub async fn delete_word(
        &self,
        ctx: &RequestContext,
        list_id: &ListId,
        word_id: &WordId,
    ) -> Result<()> {
        let user = ctx.user_id()?;
        let path = paths::word(user, list_id, word_id);
        let word: Word = self
            .docs
            .get(&path)
            .await?
            .ok_or_else(|| word_not_found(word_id))?
            .decode()?;

        self.images.release_quietly(ctx, &word.image_url).await;
        self.docs.delete(&path).await?;

        info!(user = %user, list = %list_id, word = %word_id, "word deleted");
        Ok(())
    }

    /// Detaches a word's image and deletes the blob.
    ///
    /// The blob deletion is the last step; if it fails the cleared
    /// `imageUrl` stays committed and `StorageInconsistency` is returned.
    pub async fn remove_image(
        &self,
        ctx: &RequestContext,
        list_id: &ListId,
        word_id: &WordId,
    ) -> Result<()> {
        let user = ctx.user_id()?;
        let path = paths::word(user, list_id, word_id);
        let word: Word = self
            .docs
            .get(&path)
            .await?
            .ok_or_else(|| word_not_found(word_id))?
            .decode()?;
        if !word.has_image() {
            return Ok(());
        }

        let mut fields = Document::new();
        fields.insert("imageUrl".into(), Value::String(String::new()));
        fields.insert("updatedAt".into(), serde_json::to_value(Utc::now())?);
        self.docs
            .update(&path, fields)
            .await
            .map_err(|e| not_found_as(e, || word_not_found(word_id)))?;

        self.images.release(ctx, &word.image_url).await
    }

    /// One-shot read of a list's words, oldest first.
    pub async fn fetch_words(&self, ctx: &RequestContext, list_id: &ListId) -> Result<Vec<Word>> {
        let user = ctx.user_id()?;
        let docs = self.docs.query(&paths::words(user, list_id), &[]).await?;
        Ok(decode_words(&docs))
    }

    /// Live view of a list's words. A deleted or unknown list yields an
    /// empty snapshot rather than an error.
    pub async fn watch_words(&self, ctx: &RequestContext, list_id: &ListId) -> Result<WordFeed> {
        let user = ctx.user_id()?;
        let rx = self.docs.subscribe(&paths::words(user, list_id)).await?;
        Ok(WordFeed::new(list_id.clone(), rx))
    }

    /// Releases every word image of a list and stages the word deletions
    /// into `batch`. Returns the number of words staged.
    pub(crate) async fn stage_list_purge(
        &self,
        ctx: &RequestContext,
        user: &UserId,
        list_id: &ListId,
        batch: &mut WriteBatch,
    ) -> Result<usize> {
        let collection = paths::words(user, list_id);
        let stored = self.docs.query(&collection, &[]).await?;
        for doc in &stored {
            if let Some(image_url) = doc.fields.get("imageUrl").and_then(Value::as_str) {
                self.images.release_quietly(ctx, image_url).await;
            }
            batch.delete(collection.doc(doc.id.clone()));
        }
        Ok(stored.len())
    }

    pub(crate) async fn ensure_list(&self, user: &UserId, list_id: &ListId) -> Result<()> {
        match self.docs.get(&paths::list(user, list_id)).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("list".into(), list_id.to_string())),
        }
    }
}

/// Decodes word documents, skipping malformed ones, oldest first.
pub(crate) fn decode_words(docs: &[StoredDoc]) -> Vec<Word> {
    let mut words: Vec<Word> = docs
        .iter()
        .filter_map(|doc| match doc.decode::<Word>() {
            Ok(word) => Some(word),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed word document");
                None
            }
        })
        .collect();
    words.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    words
}

fn word_not_found(word_id: &WordId) -> AppError {
    AppError::NotFound("word".into(), word_id.to_string())
}

pub(crate) fn not_found_as(err: StoreError, not_found: impl FnOnce() -> AppError) -> AppError {
    match err {
        StoreError::NotFound(_) => not_found(),
        other => other.into(),
    }
}
