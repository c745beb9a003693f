//! Data Access Layer for VBookmarks
//!
//! This module provides the key/value local storage the bookmark manager
//! keeps its own data in (SQLite-backed or in-memory), and the documents
//! stored there: the per-bookmark metadata side-table, the folder
//! expansion state, and the export file format.

pub mod schema;
pub mod storage;
pub mod metadata;
pub mod view_state;
pub mod export;

pub use storage::{LocalStorage, MemoryLocalStorage, SqliteLocalStorage};
pub use metadata::{MetadataStore, MetadataTable, METADATA_KEY};
pub use view_state::{ViewStateStore, EXPANDED_KEY};
pub use export::{ExportDocument, EXPORT_VERSION};

use vbookmarks_core::*;
use std::path::Path;
use std::sync::Arc;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Database manager for handling SQLite connections
pub struct DatabaseManager {
    connection: Arc<Connection>,
}

impl DatabaseManager {
    /// Create a new database manager with the specified path
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        debug!("Opening local storage database at {}", path.display());

        let connection = Connection::open(path)
            .await
            .map_err(|e| storage_error("Failed to open database", e))?;

        let manager = Self {
            connection: Arc::new(connection),
        };
        manager.initialize_schema().await?;

        Ok(manager)
    }

    /// Create an in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        let connection = Connection::open(":memory:")
            .await
            .map_err(|e| storage_error("Failed to create in-memory database", e))?;

        let manager = Self {
            connection: Arc::new(connection),
        };
        manager.initialize_schema().await?;

        Ok(manager)
    }

    /// Initialize database schema
    async fn initialize_schema(&self) -> Result<()> {
        let now = Utc::now().timestamp();
        self.connection
            .call(move |conn| {
                conn.execute_batch(schema::SCHEMA_SQL)?;
                conn.execute(
                    schema::RECORD_VERSION_SQL,
                    rusqlite::params![schema::SCHEMA_VERSION, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| storage_error("Failed to initialize schema", e))?;

        Ok(())
    }

    /// Get the connection for storage operations
    pub fn connection(&self) -> Arc<Connection> {
        Arc::clone(&self.connection)
    }

    /// Local storage backed by this database
    pub fn local_storage(&self) -> SqliteLocalStorage {
        SqliteLocalStorage::new(self.connection())
    }
}

pub(crate) fn storage_error(context: &str, error: impl std::fmt::Display) -> VBookmarksError {
    VBookmarksError::System {
        source: SystemError::Storage {
            details: format!("{}: {}", context, error),
        },
    }
}
