//! Key/value local storage

use crate::storage_error;
use vbookmarks_core::*;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_rusqlite::Connection;

/// String key/value store for the manager's own documents.
///
/// Values are whole documents; callers overwrite them wholesale.
#[async_trait]
pub trait LocalStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Returns whether the key existed
    async fn remove(&self, key: &str) -> Result<bool>;
    /// All keys in ascending order
    async fn keys(&self) -> Result<Vec<String>>;
}

/// SQLite implementation of local storage
pub struct SqliteLocalStorage {
    connection: Arc<Connection>,
}

impl SqliteLocalStorage {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl LocalStorage for SqliteLocalStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();

        self.connection
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT value FROM local_storage WHERE key = ?1")?;
                let result = stmt.query_row([&key], |row| row.get::<_, String>(0));

                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(|e| storage_error("Failed to read local storage", e))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        let now = Utc::now().timestamp_millis();

        self.connection
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO local_storage (key, value, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                    "#,
                    rusqlite::params![key, value, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| storage_error("Failed to write local storage", e))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.to_string();

        self.connection
            .call(move |conn| {
                let affected = conn.execute("DELETE FROM local_storage WHERE key = ?1", [&key])?;
                Ok(affected > 0)
            })
            .await
            .map_err(|e| storage_error("Failed to remove local storage key", e))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.connection
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM local_storage ORDER BY key")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                let mut keys = Vec::new();
                for row in rows {
                    keys.push(row?);
                }
                Ok(keys)
            })
            .await
            .map_err(|e| storage_error("Failed to list local storage keys", e))
    }
}

/// In-memory local storage
#[derive(Debug, Default)]
pub struct MemoryLocalStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryLocalStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStorage for MemoryLocalStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
