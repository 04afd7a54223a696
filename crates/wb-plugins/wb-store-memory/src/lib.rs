//! # wb-store-memory
//!
//! In-process implementations of `DocumentStore` and `BlobStore`.
//! Used by the test suites and by the binary when no persistent plugin is
//! compiled in. Nothing survives a restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::{watch, Mutex};
use tracing::debug;
use wb_core::{
    matches_all, merge_fields, BlobError, BlobStore, CollectionPath, DocPath, Document,
    DocumentStore, FieldFilter, SnapshotHub, StoreError, StoredDoc, WriteBatch, WriteOp,
};

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Document>>;

/// Document store held in a single map; batches apply under one lock.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<Collections>,
    hub: SnapshotHub,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of documents in a collection.
    pub async fn count(&self, collection: &CollectionPath) -> usize {
        self.collections
            .lock()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn snapshot(collections: &Collections, collection: &CollectionPath) -> Vec<StoredDoc> {
        collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| StoredDoc::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn publish(&self, collections: &Collections, touched: &[CollectionPath]) {
        for collection in touched {
            if self.hub.is_watched(collection) {
                self.hub
                    .publish(collection, Self::snapshot(collections, collection));
            }
        }
    }
}

/// Checks one operation against the current state without applying it.
fn check(collections: &Collections, op: &WriteOp) -> Result<(), StoreError> {
    let exists = collections
        .get(op.path().collection())
        .is_some_and(|docs| docs.contains_key(op.path().id()));
    match op {
        WriteOp::Create { path, .. } if exists => Err(StoreError::AlreadyExists(path.to_string())),
        WriteOp::Update { path, .. } if !exists => Err(StoreError::NotFound(path.to_string())),
        _ => Ok(()),
    }
}

fn apply(collections: &mut Collections, op: WriteOp) {
    match op {
        WriteOp::Set { path, fields } | WriteOp::Create { path, fields } => {
            collections
                .entry(path.collection().clone())
                .or_default()
                .insert(path.id().to_owned(), fields);
        }
        WriteOp::Update { path, fields } => {
            if let Some(existing) = collections
                .get_mut(path.collection())
                .and_then(|docs| docs.get_mut(path.id()))
            {
                merge_fields(existing, fields);
            }
        }
        WriteOp::Delete { path } => {
            if let Some(docs) = collections.get_mut(path.collection()) {
                docs.remove(path.id());
                if docs.is_empty() {
                    collections.remove(path.collection());
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<StoredDoc>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .map(|fields| StoredDoc::new(path.id(), fields.clone())))
    }

    async fn set(&self, path: &DocPath, fields: Document) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(path.clone(), fields);
        self.commit(batch).await
    }

    async fn update(&self, path: &DocPath, fields: Document) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(path.clone(), fields);
        self.commit(batch).await
    }

    async fn delete(&self, path: &DocPath) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.commit(batch).await
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDoc>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(Self::snapshot(&collections, collection)
            .into_iter()
            .filter(|doc| matches_all(filters, &doc.fields))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        for op in batch.ops() {
            check(&collections, op)?;
        }

        let mut touched: Vec<CollectionPath> = Vec::new();
        for op in batch.into_ops() {
            let collection = op.path().collection().clone();
            if !touched.contains(&collection) {
                touched.push(collection);
            }
            apply(&mut collections, op);
        }
        debug!(collections = touched.len(), "batch committed");

        self.publish(&collections, &touched);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<watch::Receiver<Vec<StoredDoc>>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(self
            .hub
            .subscribe(collection, Self::snapshot(&collections, collection)))
    }
}

/// Blob store keyed by path; download URLs are `memory://blobs/{key}`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, (Bytes, String)>,
}

const URL_PREFIX: &str = "memory://blobs/";

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Content type recorded for a key.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs.get(key).map(|entry| entry.1.clone())
    }

    fn key_of<'a>(&self, reference: &'a str) -> &'a str {
        reference.strip_prefix(URL_PREFIX).unwrap_or(reference)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        if data.is_empty() {
            return Err(BlobError::InvalidData(format!("empty upload for {key}")));
        }
        self.blobs
            .insert(key.to_owned(), (data, content_type.to_owned()));
        Ok(())
    }

    async fn download_url(&self, key: &str) -> Result<String, BlobError> {
        if !self.blobs.contains_key(key) {
            return Err(BlobError::NotFound(key.to_owned()));
        }
        Ok(format!("{URL_PREFIX}{key}"))
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let key = self.key_of(reference);
        self.blobs
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))
    }
}
