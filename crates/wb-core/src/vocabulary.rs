//! Wiring of the core components over a set of backends.

use std::sync::Arc;

use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::images::ImageAttachments;
use crate::lists::ListRegistry;
use crate::models::{ListId, RequestContext};
use crate::quiz::QuizSession;
use crate::traits::{BlobStore, DocumentStore, FetchRelay};
use crate::words::WordStore;

/// External systems the core talks to.
#[derive(Clone)]
pub struct Backends {
    pub docs: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub relay: Arc<dyn FetchRelay>,
}

#[derive(Clone)]
pub struct Vocabulary {
    pub lists: ListRegistry,
    pub words: WordStore,
    pub images: ImageAttachments,
    pub dashboard: Dashboard,
}

impl Vocabulary {
    pub fn new(backends: Backends) -> Self {
        let images = ImageAttachments::new(backends.blobs, backends.relay);
        let words = WordStore::new(backends.docs.clone(), images.clone());
        let lists = ListRegistry::new(backends.docs.clone(), words.clone());
        let dashboard = Dashboard::new(backends.docs, lists.clone());
        Self {
            lists,
            words,
            images,
            dashboard,
        }
    }

    /// Starts a self-test over the current words of a list.
    pub async fn start_quiz(&self, ctx: &RequestContext, list_id: &ListId) -> Result<QuizSession> {
        self.lists.get_list(ctx, list_id).await?;
        let words = self.words.fetch_words(ctx, list_id).await?;
        QuizSession::new(words)
    }
}
