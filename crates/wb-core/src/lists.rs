//! # List Registry
//!
//! Named, language-tagged vocabulary lists. Deleting a list cascades to its
//! words and their images.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::document::{to_document, Document, WriteBatch};
use crate::error::{AppError, Result};
use crate::migration::{MigrationReport, Migrator};
use crate::models::{Language, ListId, RequestContext, UserId, VocabularyList};
use crate::paths;
use crate::traits::DocumentStore;
use crate::words::{not_found_as, WordStore};

#[derive(Clone)]
pub struct ListRegistry {
    docs: Arc<dyn DocumentStore>,
    words: WordStore,
    migrator: Migrator,
}

impl ListRegistry {
    pub fn new(docs: Arc<dyn DocumentStore>, words: WordStore) -> Self {
        let migrator = Migrator::new(docs.clone());
        Self {
            docs,
            words,
            migrator,
        }
    }

    /// Creates a list. Duplicate names are allowed.
    pub async fn create_list(
        &self,
        ctx: &RequestContext,
        name: &str,
        language: Language,
    ) -> Result<ListId> {
        let user = ctx.user_id()?;
        let name = validated_name(name)?;

        let list = VocabularyList {
            id: ListId::new(self.docs.new_id()),
            name,
            language,
            created_at: Utc::now(),
        };
        self.docs
            .set(&paths::list(user, &list.id), to_document(&list)?)
            .await?;

        info!(user = %user, list = %list.id, %language, "list created");
        Ok(list.id)
    }

    pub async fn update_list(
        &self,
        ctx: &RequestContext,
        list_id: &ListId,
        name: &str,
        language: Language,
    ) -> Result<()> {
        let user = ctx.user_id()?;
        let name = validated_name(name)?;

        let mut fields = Document::new();
        fields.insert("name".into(), Value::String(name));
        fields.insert("language".into(), Value::String(language.as_str().into()));
        self.docs
            .update(&paths::list(user, list_id), fields)
            .await
            .map_err(|e| not_found_as(e, || list_not_found(list_id)))?;

        info!(user = %user, list = %list_id, "list updated");
        Ok(())
    }

    /// Deletes a list with all of its words.
    ///
    /// Word images are released first, one by one and best-effort; the word
    /// documents and the list document then go in one atomic batch.
    pub async fn delete_list(&self, ctx: &RequestContext, list_id: &ListId) -> Result<()> {
        let user = ctx.user_id()?;
        let list_path = paths::list(user, list_id);
        if self.docs.get(&list_path).await?.is_none() {
            return Err(list_not_found(list_id));
        }

        let mut batch = WriteBatch::new();
        let words = self
            .words
            .stage_list_purge(ctx, user, list_id, &mut batch)
            .await?;
        batch.delete(list_path);
        self.docs.commit(batch).await?;

        info!(user = %user, list = %list_id, words, "list deleted");
        Ok(())
    }

    pub async fn get_list(&self, ctx: &RequestContext, list_id: &ListId) -> Result<VocabularyList> {
        let user = ctx.user_id()?;
        let stored = self
            .docs
            .get(&paths::list(user, list_id))
            .await?
            .ok_or_else(|| list_not_found(list_id))?;
        Ok(stored.decode()?)
    }

    /// All lists of the user, sorted by name.
    ///
    /// When the user has no lists yet, legacy words are migrated first.
    pub async fn list_lists(&self, ctx: &RequestContext) -> Result<Vec<VocabularyList>> {
        let (lists, _) = self.list_lists_reporting(ctx).await?;
        Ok(lists)
    }

    /// [`list_lists`](Self::list_lists), plus the report of the lazy
    /// migration when one ran and did something.
    pub async fn list_lists_reporting(
        &self,
        ctx: &RequestContext,
    ) -> Result<(Vec<VocabularyList>, Option<MigrationReport>)> {
        let user = ctx.user_id()?;
        let mut lists = self.stored_lists(user).await?;
        let mut report = None;

        if lists.is_empty() {
            let outcome = self.migrator.run(user).await;
            if outcome.moved() > 0 {
                lists = self.stored_lists(user).await?;
            }
            if !outcome.is_empty() {
                report = Some(outcome);
            }
        }

        lists.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok((lists, report))
    }

    /// Lists exactly as stored, without triggering migration.
    pub(crate) async fn stored_lists(&self, user: &UserId) -> Result<Vec<VocabularyList>> {
        let docs = self.docs.query(&paths::lists(user), &[]).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| match doc.decode::<VocabularyList>() {
                Ok(list) => Some(list),
                Err(e) => {
                    warn!(id = %doc.id, error = %e, "skipping malformed list document");
                    None
                }
            })
            .collect())
    }
}

fn validated_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("list name is required".into()));
    }
    Ok(name.to_owned())
}

fn list_not_found(list_id: &ListId) -> AppError {
    AppError::NotFound("list".into(), list_id.to_string())
}
