//! Live word views.
//!
//! A [`WordFeed`] owns one store subscription. Dropping the feed
//! unsubscribes, so a consumer that navigates away just drops it.

use tokio::sync::watch;

use crate::document::StoredDoc;
use crate::models::{ListId, Word};
use crate::words::decode_words;

pub struct WordFeed {
    list_id: ListId,
    rx: watch::Receiver<Vec<StoredDoc>>,
}

impl WordFeed {
    pub(crate) fn new(list_id: ListId, rx: watch::Receiver<Vec<StoredDoc>>) -> Self {
        Self { list_id, rx }
    }

    pub fn list_id(&self) -> &ListId {
        &self.list_id
    }

    /// The full current set of words.
    pub fn current(&self) -> Vec<Word> {
        decode_words(&self.rx.borrow())
    }

    /// Waits for the next change and returns the full new set. Changes that
    /// land while nobody is waiting collapse into the latest snapshot.
    /// `None` once the store has shut down.
    pub async fn changed(&mut self) -> Option<Vec<Word>> {
        self.rx.changed().await.ok()?;
        let words = decode_words(&self.rx.borrow_and_update());
        Some(words)
    }
}

impl std::fmt::Debug for WordFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordFeed")
            .field("list_id", &self.list_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::to_document;

    fn word_doc(id: &str, word: &str) -> StoredDoc {
        let fields = to_document(&serde_json::json!({
            "word": word,
            "meaning": "m",
            "createdAt": "2024-01-01T00:00:00Z",
        }))
        .unwrap();
        StoredDoc::new(id, fields)
    }

    #[tokio::test]
    async fn delivers_initial_then_each_change() {
        let (tx, rx) = watch::channel(vec![word_doc("w1", "ありがとう")]);
        let mut feed = WordFeed::new(ListId::from("L1"), rx);
        assert_eq!(feed.current().len(), 1);

        tx.send_replace(vec![word_doc("w1", "ありがとう"), word_doc("w2", "こんにちは")]);
        let words = feed.changed().await.unwrap();
        assert_eq!(words.len(), 2);

        drop(tx);
        assert!(feed.changed().await.is_none());
    }
}
