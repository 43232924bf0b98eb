//! SQLite implementation of the Storage trait.
//!
//! An embedded blob store: content and metadata live in one SQLite file.
//! It uses rusqlite with bundled SQLite, wrapped in async via
//! tokio::spawn_blocking.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use buffalo_core::{Metadata, ObjectId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    join_uri, now_millis, stream_from_bytes, MetadataMerge, NewObject, ObjectSummary, Storage,
    StoredObject,
};

/// Configuration for the SQLite store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStoreConfig {
    /// Prefix of the URIs returned by `upload` and `public_uri`.
    pub base_uri: String,
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            base_uri: "sqlite://buffalo".to_string(),
        }
    }
}

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime. Each operation runs in its own
/// transaction, so a write is either fully committed or not at all; once a
/// blocking write has been dispatched it runs to completion even if the
/// calling future is dropped.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
    config: SqliteStoreConfig,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>, config: SqliteStoreConfig) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            config: SqliteStoreConfig::default(),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("mutex poisoned: {e}")))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {e}")))?
    }
}

fn parse_object_id(raw: &str) -> Result<ObjectId> {
    raw.parse()
        .map_err(|e| StoreError::InvalidData(format!("bad object id in storage: {e}")))
}

fn object_exists(conn: &Connection, key: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM objects WHERE object_id = ?1)",
        params![key],
        |row| row.get(0),
    )?)
}

fn load_metadata(conn: &Connection, key: &str) -> Result<Metadata> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM object_metadata WHERE object_id = ?1")?;
    let rows = stmt.query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut metadata = Metadata::new();
    for row in rows {
        let (k, v): (String, String) = row?;
        metadata.insert(k, v);
    }
    Ok(metadata)
}

fn replace_metadata(conn: &Connection, key: &str, metadata: &Metadata) -> Result<()> {
    conn.execute(
        "DELETE FROM object_metadata WHERE object_id = ?1",
        params![key],
    )?;

    let mut stmt = conn.prepare(
        "INSERT INTO object_metadata (object_id, key, value) VALUES (?1, ?2, ?3)",
    )?;
    for (k, v) in metadata {
        stmt.execute(params![key, k, v])?;
    }
    Ok(())
}

fn load_summary(conn: &Connection, id: ObjectId) -> Result<ObjectSummary> {
    let key = id.storage_key();
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT content_type, size FROM objects WHERE object_id = ?1",
            params![key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let (content_type, size) = row.ok_or(StoreError::NotFound(id))?;

    Ok(ObjectSummary {
        id,
        content_type,
        size: size as u64,
        metadata: load_metadata(conn, &key)?,
    })
}

#[async_trait]
impl Storage for SqliteStore {
    async fn upload(&self, object: NewObject) -> Result<String> {
        let id = object.id;

        self.blocking(move |conn| {
            let key = object.id.storage_key();
            let tx = conn.transaction()?;

            if object_exists(&tx, &key)? {
                return Err(StoreError::AlreadyExists(object.id));
            }

            let now = now_millis();
            tx.execute(
                "INSERT INTO objects (object_id, content_type, data, size, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    key,
                    object.content_type,
                    &object.data[..],
                    object.data.len() as i64,
                    now,
                ],
            )?;
            replace_metadata(&tx, &key, &object.metadata)?;

            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::debug!(object_id = %id, "sqlite object stored");
        Ok(self.public_uri(&id))
    }

    async fn retrieve(&self, id: &ObjectId) -> Result<StoredObject> {
        let id = *id;

        let (content_type, data, metadata) = self
            .blocking(move |conn| {
                let key = id.storage_key();
                let tx = conn.transaction()?;

                let row: Option<(String, Vec<u8>)> = tx
                    .query_row(
                        "SELECT content_type, data FROM objects WHERE object_id = ?1",
                        params![key],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let (content_type, data) = row.ok_or(StoreError::NotFound(id))?;
                let metadata = load_metadata(&tx, &key)?;

                tx.commit()?;
                Ok((content_type, data, metadata))
            })
            .await?;

        Ok(StoredObject {
            id,
            content_type,
            data: stream_from_bytes(Bytes::from(data)),
            metadata,
        })
    }

    async fn metadata(&self, id: &ObjectId) -> Result<ObjectSummary> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let summary = load_summary(&tx, id)?;
            tx.commit()?;
            Ok(summary)
        })
        .await
    }

    async fn delete(&self, id: &ObjectId) -> Result<()> {
        let id = *id;

        self.blocking(move |conn| {
            let key = id.storage_key();
            let tx = conn.transaction()?;

            let removed = tx.execute("DELETE FROM objects WHERE object_id = ?1", params![key])?;
            if removed == 0 {
                return Err(StoreError::NotFound(id));
            }
            tx.execute(
                "DELETE FROM object_metadata WHERE object_id = ?1",
                params![key],
            )?;

            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::debug!(object_id = %id, "sqlite object deleted");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ObjectSummary>> {
        self.blocking(|conn| {
            let tx = conn.transaction()?;

            let mut metadata: BTreeMap<String, Metadata> = BTreeMap::new();
            {
                let mut stmt = tx.prepare("SELECT object_id, key, value FROM object_metadata")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get(1)?, row.get(2)?))
                })?;
                for row in rows {
                    let (object_id, k, v): (String, String, String) = row?;
                    metadata.entry(object_id).or_default().insert(k, v);
                }
            }

            let mut summaries = Vec::new();
            {
                let mut stmt = tx.prepare(
                    "SELECT object_id, content_type, size FROM objects
                     ORDER BY created_at, object_id",
                )?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?;
                for row in rows {
                    let (object_id, content_type, size) = row?;
                    summaries.push(ObjectSummary {
                        id: parse_object_id(&object_id)?,
                        content_type,
                        size: size as u64,
                        metadata: metadata.remove(&object_id).unwrap_or_default(),
                    });
                }
            }

            tx.commit()?;
            Ok(summaries)
        })
        .await
    }

    async fn update_metadata(&self, id: &ObjectId, merge: MetadataMerge) -> Result<Metadata> {
        let id = *id;

        self.blocking(move |conn| {
            let key = id.storage_key();
            let tx = conn.transaction()?;

            if !object_exists(&tx, &key)? {
                return Err(StoreError::NotFound(id));
            }

            let current = load_metadata(&tx, &key)?;
            // Dropping the transaction on rejection rolls back.
            let updated = merge(&current).map_err(StoreError::MergeRejected)?;

            replace_metadata(&tx, &key, &updated)?;
            tx.execute(
                "UPDATE objects SET updated_at = ?1 WHERE object_id = ?2",
                params![now_millis(), key],
            )?;

            tx.commit()?;
            Ok(updated)
        })
        .await
    }

    fn public_uri(&self, id: &ObjectId) -> String {
        join_uri(&self.config.base_uri, id)
    }
}
