//! Per-bookmark metadata side-table
//!
//! Click counts, notes, tags and ratings are owned locally, not by the
//! bookmark store. The whole table lives under one storage key and is
//! written back in full after every mutation.

use crate::storage::LocalStorage;
use vbookmarks_core::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Storage key of the metadata table
pub const METADATA_KEY: &str = "vbookmarks_metadata";

/// Highest rating a bookmark can carry
pub const MAX_RATING: f64 = 5.0;

pub type MetadataTable = BTreeMap<BookmarkId, BookmarkMetadata>;

pub struct MetadataStore {
    storage: Arc<dyn LocalStorage>,
    table: RwLock<MetadataTable>,
}

impl MetadataStore {
    /// Load the table from storage.
    ///
    /// A missing key yields an empty table. A stored value that does not
    /// parse is logged and replaced by an empty table on the next write.
    pub async fn load(storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let table = match storage.get(METADATA_KEY).await? {
            None => MetadataTable::new(),
            Some(json) => match serde_json::from_str::<MetadataTable>(&json) {
                Ok(table) => table,
                Err(e) => {
                    warn!("Discarding unreadable bookmark metadata: {}", e);
                    MetadataTable::new()
                }
            },
        };

        debug!("Loaded metadata for {} bookmarks", table.len());
        Ok(Self {
            storage,
            table: RwLock::new(table),
        })
    }

    pub async fn get(&self, id: &BookmarkId) -> Option<BookmarkMetadata> {
        self.table.read().await.get(id).cloned()
    }

    /// Metadata for `id`, created and persisted on first access
    pub async fn get_or_create(&self, id: &BookmarkId) -> Result<BookmarkMetadata> {
        if let Some(existing) = self.get(id).await {
            return Ok(existing);
        }
        self.mutate(id, |_| {}).await
    }

    /// Count one open of the bookmark
    pub async fn record_click(&self, id: &BookmarkId) -> Result<BookmarkMetadata> {
        self.mutate(id, |meta| {
            meta.click_count += 1;
            meta.last_accessed = Some(Utc::now());
        })
        .await
    }

    pub async fn set_notes(&self, id: &BookmarkId, notes: impl Into<String>) -> Result<BookmarkMetadata> {
        let notes = notes.into();
        self.mutate(id, move |meta| meta.custom_notes = notes).await
    }

    /// Replace the tags; blanks are dropped and repeats kept once
    pub async fn set_tags(&self, id: &BookmarkId, tags: Vec<String>) -> Result<BookmarkMetadata> {
        let mut seen = HashSet::new();
        let tags: Vec<String> = tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect();
        self.mutate(id, move |meta| meta.tags = tags).await
    }

    /// Set the rating, clamped to `0..=5`
    pub async fn set_rating(&self, id: &BookmarkId, rating: f64) -> Result<BookmarkMetadata> {
        if !rating.is_finite() {
            return Err(ValidationError::InvalidValue {
                field: "rating".to_string(),
                reason: format!("{} is not a number", rating),
            }
            .into());
        }
        let rating = rating.clamp(0.0, MAX_RATING);
        self.mutate(id, move |meta| meta.rating = rating).await
    }

    /// Drop the entry for `id`; returns whether there was one
    pub async fn remove(&self, id: &BookmarkId) -> Result<bool> {
        let mut table = self.table.write().await;
        if !table.contains_key(id) {
            return Ok(false);
        }
        let mut next = table.clone();
        next.remove(id);
        self.persist(&next).await?;
        *table = next;
        Ok(true)
    }

    /// Drop every entry whose id is not in `live`; returns how many went
    pub async fn retain_only(&self, live: &HashSet<BookmarkId>) -> Result<usize> {
        let mut table = self.table.write().await;
        let mut next = table.clone();
        next.retain(|id, _| live.contains(id));
        let removed = table.len() - next.len();

        if removed > 0 {
            debug!("Pruned metadata of {} deleted bookmarks", removed);
            self.persist(&next).await?;
            *table = next;
        }
        Ok(removed)
    }

    pub async fn snapshot(&self) -> MetadataTable {
        self.table.read().await.clone()
    }

    /// Overwrite the whole table (import)
    pub async fn replace_all(&self, table: MetadataTable) -> Result<()> {
        let mut current = self.table.write().await;
        self.persist(&table).await?;
        *current = table;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    async fn mutate<F>(&self, id: &BookmarkId, apply: F) -> Result<BookmarkMetadata>
    where
        F: FnOnce(&mut BookmarkMetadata) + Send,
    {
        // Memory only changes once the new table is stored
        let mut table = self.table.write().await;
        let mut next = table.clone();
        let entry = next.entry(id.clone()).or_default();
        apply(entry);
        let updated = entry.clone();
        self.persist(&next).await?;
        *table = next;
        Ok(updated)
    }

    async fn persist(&self, table: &MetadataTable) -> Result<()> {
        let json = serde_json::to_string(table)?;
        self.storage.set(METADATA_KEY, &json).await
    }
}
