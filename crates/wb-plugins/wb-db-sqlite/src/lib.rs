//! # wb-db-sqlite Implementation
//!
//! This module maps the hierarchical document model onto a single SQLite
//! table keyed by `(collection, id)`, with each document's fields stored as
//! a JSON body.

use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};
use wb_core::{
    matches_all, merge_fields, CollectionPath, DocPath, Document, DocumentStore, FieldFilter,
    SnapshotHub, StoreError, StoredDoc, WriteBatch, WriteOp,
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id         TEXT NOT NULL,
    body       TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    hub: SnapshotHub,
    /// Serializes commits so snapshots are published in commit order.
    write_lock: Mutex<()>,
}

impl SqliteDocumentStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    ///
    /// # Developer Note
    /// An in-memory database lives inside one connection, so `sqlite::memory:`
    /// gets a single never-recycled connection.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid SQLite URL {url}"))?
            .create_if_missing(true);
        let in_memory = url.contains(":memory:");
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 5 })
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .with_context(|| format!("failed to open SQLite database {url}"))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .context("failed to create documents table")?;
        info!(url, "SQLite document store ready");

        Ok(Self {
            pool,
            hub: SnapshotHub::new(),
            write_lock: Mutex::new(()),
        })
    }

    /// Reads every document of `collection`. Rows whose body is not a JSON
    /// object are logged and skipped.
    async fn snapshot(&self, collection: &CollectionPath) -> Result<Vec<StoredDoc>, StoreError> {
        let rows = sqlx::query("SELECT id, body FROM documents WHERE collection = ? ORDER BY id")
            .bind(collection.as_str())
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("failed to read collection {collection}"))?;

        let docs = rows
            .into_iter()
            .filter_map(|row| {
                let id: String = row.get("id");
                let body: String = row.get("body");
                match parse_body(&collection.doc(id.clone()), &body) {
                    Ok(fields) => Some(StoredDoc::new(id, fields)),
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable document");
                        None
                    }
                }
            })
            .collect();
        Ok(docs)
    }
}

fn parse_body(path: &DocPath, body: &str) -> Result<Document, StoreError> {
    serde_json::from_str(body).map_err(|source| StoreError::Malformed {
        path: path.to_string(),
        source,
    })
}

fn encode_body(fields: &Document) -> Result<String, StoreError> {
    serde_json::to_string(fields)
        .context("failed to encode document body")
        .map_err(StoreError::from)
}

async fn read_body(
    conn: &mut SqliteConnection,
    path: &DocPath,
) -> Result<Option<Document>, StoreError> {
    let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
        .bind(path.collection().as_str())
        .bind(path.id())
        .fetch_optional(&mut *conn)
        .await
        .with_context(|| format!("failed to read {path}"))?;

    row.map(|row| parse_body(path, &row.get::<String, _>("body")))
        .transpose()
}

async fn upsert(conn: &mut SqliteConnection, path: &DocPath, fields: &Document) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)
         ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body",
    )
    .bind(path.collection().as_str())
    .bind(path.id())
    .bind(encode_body(fields)?)
    .execute(&mut *conn)
    .await
    .with_context(|| format!("failed to write {path}"))?;
    Ok(())
}

async fn apply(conn: &mut SqliteConnection, op: &WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Set { path, fields } => upsert(conn, path, fields).await,
        WriteOp::Create { path, fields } => {
            if read_body(conn, path).await?.is_some() {
                return Err(StoreError::AlreadyExists(path.to_string()));
            }
            upsert(conn, path, fields).await
        }
        WriteOp::Update { path, fields } => {
            let mut body = read_body(conn, path)
                .await?
                .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
            merge_fields(&mut body, fields.clone());
            upsert(conn, path, &body).await
        }
        WriteOp::Delete { path } => {
            sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
                .bind(path.collection().as_str())
                .bind(path.id())
                .execute(&mut *conn)
                .await
                .with_context(|| format!("failed to delete {path}"))?;
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, path: &DocPath) -> Result<Option<StoredDoc>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("failed to acquire SQLite connection")?;
        Ok(read_body(&mut conn, path)
            .await?
            .map(|fields| StoredDoc::new(path.id(), fields)))
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
        let mut docs = self.snapshot(collection).await?;
        docs.retain(|doc| matches_all(filters, &doc.fields));
        Ok(docs)
    }

    /// Atomic batch write.
    ///
    /// # Developer Note
    /// Using a Transaction (tx) ensures a failed `create` or `update` anywhere
    /// in the batch rolls back every earlier operation of the same batch.
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;

        let mut touched: Vec<CollectionPath> = Vec::new();
        for op in batch.ops() {
            apply(&mut tx, op).await?;
            let collection = op.path().collection();
            if !touched.contains(collection) {
                touched.push(collection.clone());
            }
        }
        tx.commit().await.context("failed to commit transaction")?;
        debug!(ops = batch.len(), "batch committed");

        // The batch is durable from here on; a failed re-read only delays watchers.
        for collection in &touched {
            if !self.hub.is_watched(collection) {
                continue;
            }
            match self.snapshot(collection).await {
                Ok(snapshot) => self.hub.publish(collection, snapshot),
                Err(e) => warn!(%collection, error = %e, "failed to publish snapshot after commit"),
            }
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
    ) -> Result<watch::Receiver<Vec<StoredDoc>>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.snapshot(collection).await?;
        Ok(self.hub.subscribe(collection, current))
    }
}
