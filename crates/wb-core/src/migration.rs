//! # Legacy Migration Routine
//!
//! Moves flat, language-tagged words (`users/{uid}/vocabulary/{word}`) into
//! one synthesized list per language. Each language is one atomic batch:
//! the new list, a copy of every legacy word and the deletion of the
//! originals commit together. Languages are independent of each other.
//!
//! There is no persisted "migrated" marker; the registry only triggers a run
//! while the user has no lists at all.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::document::{to_document, FieldFilter, WriteBatch};
use crate::error::{AppError, Result};
use crate::models::{Language, LegacyWord, ListId, UserId, VocabularyList};
use crate::paths;
use crate::traits::DocumentStore;

/// A list synthesized from legacy words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedList {
    pub language: Language,
    pub list_id: ListId,
    pub words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub language: Language,
    pub message: String,
}

/// Outcome of one migration run across all language tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: Vec<MigratedList>,
    pub failures: Vec<MigrationFailure>,
}

impl MigrationReport {
    /// Number of word documents moved.
    pub fn moved(&self) -> usize {
        self.migrated.iter().map(|m| m.words).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.migrated.is_empty() && self.failures.is_empty()
    }

    /// One combined user-facing message, present only when something failed.
    pub fn summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let failed = self
            .failures
            .iter()
            .map(|f| format!("{}: {}", f.language, f.message))
            .collect::<Vec<_>>()
            .join("; ");
        let mut message = format!("legacy word migration incomplete ({failed})");
        if self.moved() > 0 {
            let done = self
                .migrated
                .iter()
                .map(|m| format!("{} words into '{}'", m.words, m.language.default_list_name()))
                .collect::<Vec<_>>()
                .join(", ");
            message.push_str(&format!("; migrated {done}"));
        }
        Some(message)
    }
}

#[derive(Clone)]
pub struct Migrator {
    docs: Arc<dyn DocumentStore>,
}

impl Migrator {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Migrates every language tag; a failing tag does not stop the others.
    pub async fn run(&self, user: &UserId) -> MigrationReport {
        let mut report = MigrationReport::default();
        for language in Language::ALL {
            match self.migrate_language(user, language).await {
                Ok(Some(list)) => report.migrated.push(list),
                Ok(None) => {}
                Err(e) => {
                    warn!(user = %user, %language, error = %e, "legacy migration failed");
                    report.failures.push(MigrationFailure {
                        language,
                        message: e.to_string(),
                    });
                }
            }
        }
        if !report.is_empty() {
            info!(user = %user, moved = report.moved(), failures = report.failures.len(), "legacy migration finished");
        }
        report
    }

    /// Migrates the legacy words of one language, if there are any.
    pub async fn migrate_language(
        &self,
        user: &UserId,
        language: Language,
    ) -> Result<Option<MigratedList>> {
        let legacy_collection = paths::legacy_words(user);
        let legacy = self
            .docs
            .query(
                &legacy_collection,
                &[FieldFilter::eq("language", language.as_str())],
            )
            .await?;
        if legacy.is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let list = VocabularyList {
            id: ListId::new(self.docs.new_id()),
            name: language.default_list_name().to_owned(),
            language,
            created_at: now,
        };

        let mut batch = WriteBatch::new();
        batch.set(paths::list(user, &list.id), to_document(&list)?);
        for stored in &legacy {
            let legacy_word: LegacyWord = stored.decode().map_err(|e| {
                AppError::Internal(format!("legacy word '{}' is malformed: {e}", stored.id))
            })?;
            let (word_id, fields) = legacy_word.into_list_word(now)?;
            batch.create(paths::word(user, &list.id, &word_id), fields);
            batch.delete(legacy_collection.doc(stored.id.clone()));
        }
        self.docs.commit(batch).await?;

        info!(user = %user, %language, list = %list.id, words = legacy.len(), "legacy words migrated");
        Ok(Some(MigratedList {
            language,
            list_id: list.id,
            words: legacy.len(),
        }))
    }
}
