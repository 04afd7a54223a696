//! Home-page statistics.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::lists::ListRegistry;
use crate::models::{RequestContext, VocabularyList};
use crate::paths;
use crate::traits::DocumentStore;

/// How many recently created lists the dashboard shows.
pub const RECENT_LISTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_lists: usize,
    pub total_words: usize,
    /// Newest first.
    pub recent_lists: Vec<VocabularyList>,
}

#[derive(Clone)]
pub struct Dashboard {
    docs: Arc<dyn DocumentStore>,
    lists: ListRegistry,
}

impl Dashboard {
    pub fn new(docs: Arc<dyn DocumentStore>, lists: ListRegistry) -> Self {
        Self { docs, lists }
    }

    /// Read-only: never triggers legacy migration.
    pub async fn stats(&self, ctx: &RequestContext) -> Result<DashboardStats> {
        let user = ctx.user_id()?;
        let mut lists = self.lists.stored_lists(user).await?;

        let mut total_words = 0;
        for list in &lists {
            total_words += self
                .docs
                .query(&paths::words(user, &list.id), &[])
                .await?
                .len();
        }

        let total_lists = lists.len();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        lists.truncate(RECENT_LISTS);

        Ok(DashboardStats {
            total_lists,
            total_words,
            recent_lists: lists,
        })
    }
}
