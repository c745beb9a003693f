//! Bookmark store traits

use vbookmarks_core::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Change notification emitted by a bookmark store after a mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BookmarkEvent {
    Created { id: BookmarkId, node: BookmarkNode },
    Removed { id: BookmarkId, parent_id: BookmarkId, index: usize },
    Changed { id: BookmarkId, title: String, url: Option<String> },
    Moved {
        id: BookmarkId,
        parent_id: BookmarkId,
        index: usize,
        old_parent_id: BookmarkId,
        old_index: usize,
    },
    ChildrenReordered { id: BookmarkId, child_ids: Vec<BookmarkId> },
}

/// Async contract over the host bookmark store.
///
/// The store is the source of truth: every failure is reported as
/// `StoreError::Rejected` carrying the host's message, and nothing is
/// retried here.
#[async_trait]
pub trait BookmarkStore: Send + Sync {
    /// The whole tree, starting at the invisible root
    async fn get_tree(&self) -> Result<Vec<BookmarkNode>>;

    async fn create(&self, details: CreateDetails) -> Result<BookmarkNode>;

    async fn update(&self, id: &BookmarkId, changes: BookmarkChanges) -> Result<BookmarkNode>;

    async fn move_node(&self, id: &BookmarkId, destination: MoveDestination) -> Result<BookmarkNode>;

    /// Remove a bookmark or an empty folder
    async fn remove(&self, id: &BookmarkId) -> Result<()>;

    /// Remove a folder and everything below it
    async fn remove_tree(&self, id: &BookmarkId) -> Result<()>;

    async fn search(&self, query: &str) -> Result<Vec<BookmarkNode>>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent>;
}
