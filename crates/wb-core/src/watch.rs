//! Snapshot fan-out for live collection subscriptions.
//!
//! Adapters publish a fresh snapshot of a collection after each committed
//! change; only collections with live receivers keep a sender around.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;

use crate::document::{CollectionPath, StoredDoc};

#[derive(Debug, Default)]
pub struct SnapshotHub {
    senders: DashMap<CollectionPath, watch::Sender<Vec<StoredDoc>>>,
}

impl SnapshotHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a receiver. `current` seeds the channel when the collection
    /// has no live receivers; a watched sender already holds the latest
    /// published snapshot.
    pub fn subscribe(
        &self,
        collection: &CollectionPath,
        current: Vec<StoredDoc>,
    ) -> watch::Receiver<Vec<StoredDoc>> {
        match self.senders.entry(collection.clone()) {
            Entry::Occupied(entry) => {
                let tx = entry.get();
                // Unwatched senders missed every write since their last receiver left.
                if tx.receiver_count() == 0 {
                    tx.send_replace(current);
                }
                tx.subscribe()
            }
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(current);
                entry.insert(tx);
                rx
            }
        }
    }

    pub fn is_watched(&self, collection: &CollectionPath) -> bool {
        self.senders
            .get(collection)
            .is_some_and(|tx| tx.receiver_count() > 0)
    }

    /// Pushes a snapshot to every receiver of `collection`, dropping the
    /// sender once all receivers are gone.
    pub fn publish(&self, collection: &CollectionPath, snapshot: Vec<StoredDoc>) {
        if let Some(tx) = self.senders.get(collection) {
            tx.send_replace(snapshot);
        }
        self.senders
            .remove_if(collection, |_, tx| tx.receiver_count() == 0);
    }
}
