//! Folder expansion state of the tree view

use crate::storage::LocalStorage;
use vbookmarks_core::*;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Storage key of the expanded-folder set
pub const EXPANDED_KEY: &str = "vbookmarks_expanded";

/// Set of expanded folder ids, persisted wholesale as a JSON array
pub struct ViewStateStore {
    storage: Arc<dyn LocalStorage>,
    expanded: RwLock<BTreeSet<BookmarkId>>,
}

impl ViewStateStore {
    pub async fn load(storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let expanded = match storage.get(EXPANDED_KEY).await? {
            None => BTreeSet::new(),
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Discarding unreadable folder state: {}", e);
                BTreeSet::new()
            }),
        };

        Ok(Self {
            storage,
            expanded: RwLock::new(expanded),
        })
    }

    pub async fn is_expanded(&self, id: &BookmarkId) -> bool {
        self.expanded.read().await.contains(id)
    }

    pub async fn set_expanded(&self, id: &BookmarkId, expanded: bool) -> Result<()> {
        let mut set = self.expanded.write().await;
        let mut next = set.clone();
        let changed = if expanded {
            next.insert(id.clone())
        } else {
            next.remove(id)
        };
        if changed {
            self.persist(&next).await?;
            *set = next;
        }
        Ok(())
    }

    /// Flip the state of `id`; returns the new state
    pub async fn toggle(&self, id: &BookmarkId) -> Result<bool> {
        let mut set = self.expanded.write().await;
        let mut next = set.clone();
        let now_expanded = if next.remove(id) {
            false
        } else {
            next.insert(id.clone());
            true
        };
        self.persist(&next).await?;
        *set = next;
        Ok(now_expanded)
    }

    /// Forget folders that no longer exist
    pub async fn retain_only(&self, live: &HashSet<BookmarkId>) -> Result<()> {
        let mut set = self.expanded.write().await;
        let mut next = set.clone();
        next.retain(|id| live.contains(id));
        if next.len() != set.len() {
            self.persist(&next).await?;
            *set = next;
        }
        Ok(())
    }

    pub async fn expanded(&self) -> Vec<BookmarkId> {
        self.expanded.read().await.iter().cloned().collect()
    }

    async fn persist(&self, set: &BTreeSet<BookmarkId>) -> Result<()> {
        let json = serde_json::to_string(set)?;
        self.storage.set(EXPANDED_KEY, &json).await
    }
}
