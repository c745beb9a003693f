//! In-memory bookmark store
//!
//! Mirrors the behaviour of the browser bookmark API closely enough to
//! stand in for it: a fixed root with two permanent folders, decimal ids
//! handed out in creation order, host-style rejection messages, and a
//! change notification after every successful mutation.
//!
//! A store can be seeded from a Chrome/Edge `Bookmarks` JSON file.

use crate::traits::{BookmarkEvent, BookmarkStore};
use vbookmarks_core::*;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const ROOT_ID: &str = "0";
const BOOKMARKS_BAR_ID: &str = "1";
const OTHER_BOOKMARKS_ID: &str = "2";

const EVENT_CAPACITY: usize = 256;

/// Milliseconds between 1601-01-01 (Chrome's epoch) and 1970-01-01
const WINDOWS_EPOCH_OFFSET_MS: i64 = 11_644_473_600_000;

const ERR_NOT_FOUND: &str = "Can't find bookmark for id.";
const ERR_PARENT_NOT_FOUND: &str = "Can't find parent bookmark for id.";
const ERR_PARENT_NOT_FOLDER: &str = "Parameter 'parentId' does not specify a folder.";
const ERR_MODIFY_ROOT: &str = "Can't modify the root bookmark folders.";
const ERR_NON_EMPTY: &str = "Can't remove non-empty folder (use recursive to force).";
const ERR_FOLDER_URL: &str = "Can't set URL of a bookmark folder.";
const ERR_INVALID_URL: &str = "Invalid URL.";
const ERR_MOVE_INTO_SELF: &str = "Can't move a folder into itself or one of its descendants.";

/// Chrome/Edge bookmark JSON structure
#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarks {
    pub roots: ChromeBookmarkRoots,
    pub version: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarkRoots {
    pub bookmark_bar: ChromeBookmarkNode,
    pub other: ChromeBookmarkNode,
    pub synced: Option<ChromeBookmarkNode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChromeBookmarkNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub url: Option<String>,
    pub date_added: Option<String>,
    pub date_last_used: Option<String>,
    pub date_modified: Option<String>,
    pub children: Option<Vec<ChromeBookmarkNode>>,
}

#[derive(Debug, Clone)]
struct Entry {
    parent_id: Option<BookmarkId>,
    title: String,
    url: Option<String>,
    date_added: Option<i64>,
    date_last_used: Option<i64>,
    date_group_modified: Option<i64>,
    children: Vec<BookmarkId>,
}

impl Entry {
    fn folder(parent_id: Option<BookmarkId>, title: &str) -> Self {
        Self {
            parent_id,
            title: title.to_string(),
            url: None,
            date_added: Some(now_ms()),
            date_last_used: None,
            date_group_modified: None,
            children: Vec::new(),
        }
    }

    fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

#[derive(Debug)]
struct StoreInner {
    nodes: HashMap<BookmarkId, Entry>,
    permanent: HashSet<BookmarkId>,
    next_id: u64,
}

impl StoreInner {
    fn entry(&self, id: &BookmarkId, operation: &str) -> Result<&Entry> {
        self.nodes
            .get(id)
            .ok_or_else(|| StoreError::rejected(operation, ERR_NOT_FOUND).into())
    }

    fn index_of(&self, id: &BookmarkId) -> usize {
        self.nodes
            .get(id)
            .and_then(|e| e.parent_id.as_ref())
            .and_then(|p| self.nodes.get(p))
            .and_then(|p| p.children.iter().position(|c| c == id))
            .unwrap_or(0)
    }

    fn build_node(&self, id: &BookmarkId) -> Option<BookmarkNode> {
        let entry = self.nodes.get(id)?;
        let kind = match &entry.url {
            Some(url) => NodeKind::Url {
                url: url.clone(),
                date_last_used: entry.date_last_used,
            },
            None => NodeKind::Folder {
                children: entry
                    .children
                    .iter()
                    .filter_map(|c| self.build_node(c))
                    .collect(),
                date_group_modified: entry.date_group_modified,
            },
        };
        Some(BookmarkNode {
            id: id.clone(),
            parent_id: entry.parent_id.clone(),
            index: self.index_of(id),
            title: entry.title.clone(),
            date_added: entry.date_added,
            kind,
        })
    }

    fn allocate_id(&mut self) -> BookmarkId {
        let id = BookmarkId(self.next_id.to_string());
        self.next_id += 1;
        id
    }

    /// Resolve a parent for insertion, checking it exists and is a writable folder
    fn writable_folder(&self, parent_id: &BookmarkId, operation: &str) -> Result<()> {
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| StoreError::rejected(operation, ERR_PARENT_NOT_FOUND))?;
        if !parent.is_folder() {
            return Err(StoreError::rejected(operation, ERR_PARENT_NOT_FOLDER).into());
        }
        if parent_id.as_str() == ROOT_ID {
            return Err(StoreError::rejected(operation, ERR_MODIFY_ROOT).into());
        }
        Ok(())
    }

    fn is_ancestor(&self, ancestor: &BookmarkId, id: &BookmarkId) -> bool {
        let mut current = Some(id.clone());
        while let Some(cursor) = current {
            if &cursor == ancestor {
                return true;
            }
            current = self.nodes.get(&cursor).and_then(|e| e.parent_id.clone());
        }
        false
    }

    fn detach(&mut self, id: &BookmarkId) -> Option<(BookmarkId, usize)> {
        let parent_id = self.nodes.get(id)?.parent_id.clone()?;
        let parent = self.nodes.get_mut(&parent_id)?;
        let index = parent.children.iter().position(|c| c == id)?;
        parent.children.remove(index);
        parent.date_group_modified = Some(now_ms());
        Some((parent_id, index))
    }

    fn attach(&mut self, id: &BookmarkId, parent_id: &BookmarkId, index: Option<usize>) -> usize {
        let mut position = 0;
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            position = index.unwrap_or(parent.children.len()).min(parent.children.len());
            parent.children.insert(position, id.clone());
            parent.date_group_modified = Some(now_ms());
        }
        if let Some(entry) = self.nodes.get_mut(id) {
            entry.parent_id = Some(parent_id.clone());
        }
        position
    }

    fn drop_subtree(&mut self, id: &BookmarkId) -> usize {
        let Some(entry) = self.nodes.remove(id) else {
            return 0;
        };
        1 + entry
            .children
            .iter()
            .map(|c| self.drop_subtree(c))
            .sum::<usize>()
    }

    fn collect_matches(&self, id: &BookmarkId, terms: &[String], out: &mut Vec<BookmarkId>) {
        let Some(entry) = self.nodes.get(id) else {
            return;
        };
        match &entry.url {
            Some(url) => {
                let title = entry.title.to_lowercase();
                let url = url.to_lowercase();
                if terms.iter().all(|t| title.contains(t) || url.contains(t)) {
                    out.push(id.clone());
                }
            }
            None => {
                for child in &entry.children {
                    self.collect_matches(child, terms, out);
                }
            }
        }
    }
}

/// Bookmark store kept entirely in memory
pub struct MemoryBookmarkStore {
    inner: RwLock<StoreInner>,
    events: broadcast::Sender<BookmarkEvent>,
}

impl MemoryBookmarkStore {
    /// Create a store holding only the root and its two permanent folders
    pub fn new() -> Self {
        let root = BookmarkId::from(ROOT_ID);
        let bar = BookmarkId::from(BOOKMARKS_BAR_ID);
        let other = BookmarkId::from(OTHER_BOOKMARKS_ID);

        let mut nodes = HashMap::new();
        let mut root_entry = Entry::folder(None, "");
        root_entry.children = vec![bar.clone(), other.clone()];
        nodes.insert(root.clone(), root_entry);
        nodes.insert(bar.clone(), Entry::folder(Some(root.clone()), "Bookmarks bar"));
        nodes.insert(other.clone(), Entry::folder(Some(root.clone()), "Other bookmarks"));

        Self::from_inner(StoreInner {
            nodes,
            permanent: [root, bar, other].into_iter().collect(),
            next_id: 3,
        })
    }

    fn from_inner(inner: StoreInner) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: RwLock::new(inner),
            events,
        }
    }

    /// Load a store from a Chrome/Edge `Bookmarks` file
    pub fn from_chrome_bookmarks_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let store = Self::from_chrome_json(&content)?;
        info!("Loaded bookmark store from {}", path.as_ref().display());
        Ok(store)
    }

    /// Load a store from the contents of a Chrome/Edge `Bookmarks` file.
    ///
    /// Ids from the file are kept; new ids continue after the largest one.
    pub fn from_chrome_json(json: &str) -> Result<Self> {
        let chrome: ChromeBookmarks = serde_json::from_str(json)?;
        let root = BookmarkId::from(ROOT_ID);

        let mut inner = StoreInner {
            nodes: HashMap::new(),
            permanent: HashSet::from([root.clone()]),
            next_id: 1,
        };

        let mut top_level = vec![&chrome.roots.bookmark_bar, &chrome.roots.other];
        if let Some(ref synced) = chrome.roots.synced {
            top_level.push(synced);
        }

        let mut root_entry = Entry::folder(None, "");
        root_entry.date_added = None;
        for node in top_level {
            let id = import_chrome_node(&mut inner, node, &root)?;
            inner.permanent.insert(id.clone());
            root_entry.children.push(id);
        }
        inner.nodes.insert(root, root_entry);

        debug!(
            "Imported {} bookmark nodes (format version {:?})",
            inner.nodes.len(),
            chrome.version
        );
        Ok(Self::from_inner(inner))
    }

    /// Number of nodes, folders included, root excluded
    pub async fn len(&self) -> usize {
        self.inner.read().await.nodes.len().saturating_sub(1)
    }

    /// True when only the permanent folders are left
    pub async fn is_empty(&self) -> bool {
        let inner = self.inner.read().await;
        inner.nodes.len() <= inner.permanent.len()
    }

    fn emit(&self, event: BookmarkEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }
}

impl Default for MemoryBookmarkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookmarkStore for MemoryBookmarkStore {
    async fn get_tree(&self) -> Result<Vec<BookmarkNode>> {
        let inner = self.inner.read().await;
        let root = inner
            .build_node(&BookmarkId::from(ROOT_ID))
            .ok_or_else(|| StoreError::Unavailable {
                reason: "bookmark root is missing".to_string(),
            })?;
        Ok(vec![root])
    }

    async fn create(&self, details: CreateDetails) -> Result<BookmarkNode> {
        const OP: &str = "create";
        let mut inner = self.inner.write().await;

        let parent_id = details
            .parent_id
            .clone()
            .unwrap_or_else(|| BookmarkId::from(OTHER_BOOKMARKS_ID));
        inner.writable_folder(&parent_id, OP)?;
        if let Some(ref url) = details.url {
            validate_url(url, OP)?;
        }

        let id = inner.allocate_id();
        let entry = Entry {
            parent_id: None,
            title: details.title.clone(),
            url: details.url.clone(),
            date_added: Some(now_ms()),
            date_last_used: None,
            date_group_modified: None,
            children: Vec::new(),
        };
        inner.nodes.insert(id.clone(), entry);
        inner.attach(&id, &parent_id, details.index);

        let node = inner
            .build_node(&id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        drop(inner);

        debug!("Created bookmark node {} under {}", id, parent_id);
        self.emit(BookmarkEvent::Created {
            id,
            node: node.clone(),
        });
        Ok(node)
    }

    async fn update(&self, id: &BookmarkId, changes: BookmarkChanges) -> Result<BookmarkNode> {
        const OP: &str = "update";
        let mut inner = self.inner.write().await;

        let is_folder = inner.entry(id, OP)?.is_folder();
        if inner.permanent.contains(id) {
            return Err(StoreError::rejected(OP, ERR_MODIFY_ROOT).into());
        }
        if let Some(ref url) = changes.url {
            if is_folder {
                return Err(StoreError::rejected(OP, ERR_FOLDER_URL).into());
            }
            validate_url(url, OP)?;
        }

        if let Some(entry) = inner.nodes.get_mut(id) {
            if let Some(title) = changes.title {
                entry.title = title;
            }
            if let Some(url) = changes.url {
                entry.url = Some(url);
            }
        }

        let node = inner
            .build_node(id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        drop(inner);

        self.emit(BookmarkEvent::Changed {
            id: id.clone(),
            title: node.title.clone(),
            url: node.url().map(str::to_string),
        });
        Ok(node)
    }

    async fn move_node(&self, id: &BookmarkId, destination: MoveDestination) -> Result<BookmarkNode> {
        const OP: &str = "move";
        let mut inner = self.inner.write().await;

        let current_parent = inner.entry(id, OP)?.parent_id.clone();
        if inner.permanent.contains(id) {
            return Err(StoreError::rejected(OP, ERR_MODIFY_ROOT).into());
        }
        let parent_id = match destination.parent_id.or(current_parent) {
            Some(p) => p,
            None => return Err(StoreError::rejected(OP, ERR_PARENT_NOT_FOUND).into()),
        };
        inner.writable_folder(&parent_id, OP)?;
        if inner.is_ancestor(id, &parent_id) {
            return Err(StoreError::rejected(OP, ERR_MOVE_INTO_SELF).into());
        }

        let (old_parent_id, old_index) = inner
            .detach(id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        let index = inner.attach(id, &parent_id, destination.index);

        let node = inner
            .build_node(id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        drop(inner);

        self.emit(BookmarkEvent::Moved {
            id: id.clone(),
            parent_id,
            index,
            old_parent_id,
            old_index,
        });
        Ok(node)
    }

    async fn remove(&self, id: &BookmarkId) -> Result<()> {
        const OP: &str = "remove";
        let mut inner = self.inner.write().await;

        let entry = inner.entry(id, OP)?;
        if inner.permanent.contains(id) {
            return Err(StoreError::rejected(OP, ERR_MODIFY_ROOT).into());
        }
        if !entry.children.is_empty() {
            return Err(StoreError::rejected(OP, ERR_NON_EMPTY).into());
        }

        let (parent_id, index) = inner
            .detach(id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        inner.nodes.remove(id);
        drop(inner);

        debug!("Removed bookmark node {}", id);
        self.emit(BookmarkEvent::Removed {
            id: id.clone(),
            parent_id,
            index,
        });
        Ok(())
    }

    async fn remove_tree(&self, id: &BookmarkId) -> Result<()> {
        const OP: &str = "removeTree";
        let mut inner = self.inner.write().await;

        inner.entry(id, OP)?;
        if inner.permanent.contains(id) {
            return Err(StoreError::rejected(OP, ERR_MODIFY_ROOT).into());
        }

        let (parent_id, index) = inner
            .detach(id)
            .ok_or_else(|| StoreError::rejected(OP, ERR_NOT_FOUND))?;
        let removed = inner.drop_subtree(id);
        drop(inner);

        debug!("Removed subtree {} ({} nodes)", id, removed);
        self.emit(BookmarkEvent::Removed {
            id: id.clone(),
            parent_id,
            index,
        });
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<BookmarkNode>> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().await;
        let mut ids = Vec::new();
        inner.collect_matches(&BookmarkId::from(ROOT_ID), &terms, &mut ids);
        Ok(ids.iter().filter_map(|id| inner.build_node(id)).collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent> {
        self.events.subscribe()
    }
}

/// Default location of Chrome's `Bookmarks` file for the default profile
pub fn default_chrome_bookmarks_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        dirs::data_local_dir().map(|p| {
            p.join("Google").join("Chrome").join("User Data").join("Default").join("Bookmarks")
        })
    }

    #[cfg(target_os = "linux")]
    {
        dirs::config_dir().map(|p| p.join("google-chrome").join("Default").join("Bookmarks"))
    }

    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|p| {
            p.join("Library")
                .join("Application Support")
                .join("Google")
                .join("Chrome")
                .join("Default")
                .join("Bookmarks")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

fn import_chrome_node(
    inner: &mut StoreInner,
    node: &ChromeBookmarkNode,
    parent_id: &BookmarkId,
) -> Result<BookmarkId> {
    let id = BookmarkId(node.id.clone());
    if id.as_str().is_empty() {
        return Err(ValidationError::EmptyId.into());
    }
    if inner.nodes.contains_key(&id) || id.as_str() == ROOT_ID {
        return Err(ValidationError::DuplicateId { id: node.id.clone() }.into());
    }
    if let Ok(numeric) = node.id.parse::<u64>() {
        inner.next_id = inner.next_id.max(numeric + 1);
    }

    let is_url = node.node_type == "url";
    // Reserve the id before descending so children see a consistent map
    inner.nodes.insert(
        id.clone(),
        Entry {
            parent_id: Some(parent_id.clone()),
            title: node.name.clone(),
            url: if is_url { Some(node.url.clone().unwrap_or_default()) } else { None },
            date_added: node.date_added.as_deref().and_then(parse_chrome_timestamp),
            date_last_used: node.date_last_used.as_deref().and_then(parse_chrome_timestamp),
            date_group_modified: node.date_modified.as_deref().and_then(parse_chrome_timestamp),
            children: Vec::new(),
        },
    );

    if !is_url {
        let mut children = Vec::new();
        for child in node.children.iter().flatten() {
            children.push(import_chrome_node(inner, child, &id)?);
        }
        if let Some(entry) = inner.nodes.get_mut(&id) {
            entry.children = children;
        }
    }
    Ok(id)
}

/// Parse a Chrome timestamp (microseconds since 1601) into ms since the Unix epoch.
/// Chrome writes "0" for never-used; that maps to `None`.
fn parse_chrome_timestamp(timestamp: &str) -> Option<i64> {
    let micros: i64 = timestamp.parse().ok()?;
    if micros <= 0 {
        return None;
    }
    Some(micros / 1000 - WINDOWS_EPOCH_OFFSET_MS)
}

fn validate_url(url: &str, operation: &str) -> Result<()> {
    match url::Url::parse(url) {
        Ok(_) => Ok(()),
        Err(_) => Err(StoreError::rejected(operation, ERR_INVALID_URL).into()),
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_url(parent: &str, title: &str, url: &str) -> CreateDetails {
        CreateDetails {
            parent_id: Some(BookmarkId::from(parent)),
            index: None,
            title: title.to_string(),
            url: Some(url.to_string()),
        }
    }

    fn create_folder(parent: &str, title: &str) -> CreateDetails {
        CreateDetails {
            parent_id: Some(BookmarkId::from(parent)),
            index: None,
            title: title.to_string(),
            url: None,
        }
    }

    fn rejection(err: VBookmarksError) -> String {
        match err {
            VBookmarksError::Store { source } => source.host_message().to_string(),
            other => panic!("expected store error, got {other:?}"),
        }
    }

    const CHROME_JSON: &str = r#"{
        "checksum": "abc",
        "roots": {
            "bookmark_bar": {
                "id": "1", "name": "Bookmarks bar", "type": "folder",
                "date_added": "13351334400000000",
                "children": [
                    { "id": "5", "name": "Rust", "type": "url", "url": "https://rust-lang.org/",
                      "date_added": "13351334400000000", "date_last_used": "0" },
                    { "id": "6", "name": "Docs", "type": "folder", "children": [
                        { "id": "9", "name": "docs.rs", "type": "url", "url": "https://docs.rs" }
                    ]}
                ]
            },
            "other": { "id": "2", "name": "Other bookmarks", "type": "folder", "children": [] },
            "synced": { "id": "3", "name": "Mobile bookmarks", "type": "folder", "children": [] }
        },
        "version": 1
    }"#;

    #[tokio::test]
    async fn test_new_store_has_permanent_folders() {
        let store = MemoryBookmarkStore::new();
        let tree = store.get_tree().await.unwrap();
        assert_eq!(tree.len(), 1);
        let titles: Vec<_> = tree[0].children().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Bookmarks bar", "Other bookmarks"]);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_with_synced_root() {
        let json = r#"{
            "roots": {
                "bookmark_bar": { "id": "1", "name": "Bookmarks bar", "type": "folder", "children": [] },
                "other": { "id": "2", "name": "Other bookmarks", "type": "folder", "children": [] },
                "synced": { "id": "3", "name": "Mobile bookmarks", "type": "folder", "children": [] }
            },
            "version": 1
        }"#;
        let store = MemoryBookmarkStore::from_chrome_json(json).unwrap();
        assert_eq!(store.len().await, 3);
        assert!(store.is_empty().await);

        store.create(create_url("3", "Phone", "https://phone.example")).await.unwrap();
        assert!(!store.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_defaults_to_other_bookmarks() {
        let store = MemoryBookmarkStore::new();
        let node = store
            .create(CreateDetails {
                title: "Example".to_string(),
                url: Some("https://example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(node.id.as_str(), "3");
        assert_eq!(node.parent_id, Some(BookmarkId::from("2")));
        assert_eq!(node.url(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn test_create_with_index_inserts_in_place() {
        let store = MemoryBookmarkStore::new();
        store.create(create_url("1", "a", "https://a.com")).await.unwrap();
        store.create(create_url("1", "b", "https://b.com")).await.unwrap();
        let mut details = create_url("1", "first", "https://first.com");
        details.index = Some(0);
        let node = store.create(details).await.unwrap();
        assert_eq!(node.index, 0);

        let records = flatten(&store.get_tree().await.unwrap());
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "a", "b"]);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let store = MemoryBookmarkStore::new();
        let err = store.create(create_url("42", "x", "https://x.com")).await.unwrap_err();
        assert_eq!(rejection(err), ERR_PARENT_NOT_FOUND);

        let err = store.create(create_url("0", "x", "https://x.com")).await.unwrap_err();
        assert_eq!(rejection(err), ERR_MODIFY_ROOT);

        let err = store.create(create_url("1", "x", "not a url")).await.unwrap_err();
        assert_eq!(rejection(err), ERR_INVALID_URL);

        let leaf = store.create(create_url("1", "x", "https://x.com")).await.unwrap();
        let err = store
            .create(create_url(leaf.id.as_str(), "y", "https://y.com"))
            .await
            .unwrap_err();
        assert_eq!(rejection(err), ERR_PARENT_NOT_FOLDER);
    }

    #[tokio::test]
    async fn test_update_title_and_url() {
        let store = MemoryBookmarkStore::new();
        let node = store.create(create_url("1", "Old", "https://old.com")).await.unwrap();
        let updated = store
            .update(
                &node.id,
                BookmarkChanges {
                    title: Some("New".to_string()),
                    url: Some("https://new.com".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.url(), Some("https://new.com"));
    }

    #[tokio::test]
    async fn test_update_rejections() {
        let store = MemoryBookmarkStore::new();
        let folder = store.create(create_folder("1", "Folder")).await.unwrap();
        let err = store
            .update(
                &folder.id,
                BookmarkChanges {
                    url: Some("https://x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rejection(err), ERR_FOLDER_URL);

        let err = store
            .update(&BookmarkId::from("1"), BookmarkChanges::default())
            .await
            .unwrap_err();
        assert_eq!(rejection(err), ERR_MODIFY_ROOT);

        let err = store
            .update(&BookmarkId::from("999"), BookmarkChanges::default())
            .await
            .unwrap_err();
        assert_eq!(rejection(err), ERR_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_move_between_folders() {
        let store = MemoryBookmarkStore::new();
        let folder = store.create(create_folder("1", "Folder")).await.unwrap();
        let leaf = store.create(create_url("2", "x", "https://x.com")).await.unwrap();

        let moved = store
            .move_node(
                &leaf.id,
                MoveDestination {
                    parent_id: Some(folder.id.clone()),
                    index: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(moved.parent_id, Some(folder.id.clone()));

        let records = flatten(&store.get_tree().await.unwrap());
        assert_eq!(records[0].path, vec!["Bookmarks bar", "Folder"]);
    }

    #[tokio::test]
    async fn test_move_folder_into_descendant_rejected() {
        let store = MemoryBookmarkStore::new();
        let outer = store.create(create_folder("1", "Outer")).await.unwrap();
        let inner = store.create(create_folder(outer.id.as_str(), "Inner")).await.unwrap();

        let err = store
            .move_node(
                &outer.id,
                MoveDestination {
                    parent_id: Some(inner.id.clone()),
                    index: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(rejection(err), ERR_MOVE_INTO_SELF);
    }

    #[tokio::test]
    async fn test_remove_and_remove_tree() {
        let store = MemoryBookmarkStore::new();
        let folder = store.create(create_folder("1", "Folder")).await.unwrap();
        store
            .create(create_url(folder.id.as_str(), "x", "https://x.com"))
            .await
            .unwrap();

        let err = store.remove(&folder.id).await.unwrap_err();
        assert_eq!(rejection(err), ERR_NON_EMPTY);

        store.remove_tree(&folder.id).await.unwrap();
        assert!(flatten(&store.get_tree().await.unwrap()).is_empty());
        assert!(store.is_empty().await);

        let err = store.remove(&folder.id).await.unwrap_err();
        assert_eq!(rejection(err), ERR_NOT_FOUND);

        let err = store.remove_tree(&BookmarkId::from("2")).await.unwrap_err();
        assert_eq!(rejection(err), ERR_MODIFY_ROOT);
    }

    #[tokio::test]
    async fn test_search_requires_every_term() {
        let store = MemoryBookmarkStore::new();
        store.create(create_url("1", "Rust Book", "https://doc.rust-lang.org/book")).await.unwrap();
        store.create(create_url("1", "Rustlings", "https://github.com/rust-lang/rustlings")).await.unwrap();
        store.create(create_folder("1", "Rust folder")).await.unwrap();

        let hits = store.search("rust book").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust Book");

        let hits = store.search("RUST").await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(store.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let store = MemoryBookmarkStore::new();
        let mut rx = store.subscribe();

        let node = store.create(create_url("1", "x", "https://x.com")).await.unwrap();
        store.remove(&node.id).await.unwrap();

        match rx.recv().await.unwrap() {
            BookmarkEvent::Created { id, .. } => assert_eq!(id, node.id),
            other => panic!("unexpected event {other:?}"),
        }
        match rx.recv().await.unwrap() {
            BookmarkEvent::Removed { id, parent_id, index } => {
                assert_eq!(id, node.id);
                assert_eq!(parent_id.as_str(), "1");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_chrome_json() {
        let store = MemoryBookmarkStore::from_chrome_json(CHROME_JSON).unwrap();
        let records = flatten(&store.get_tree().await.unwrap());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_str(), "5");
        assert_eq!(records[0].url, "https://rust-lang.org/");
        assert_eq!(records[0].path, vec!["Bookmarks bar"]);
        assert!(records[0].date_added.is_some());
        assert_eq!(records[0].date_last_used, None);
        assert_eq!(records[1].path, vec!["Bookmarks bar", "Docs"]);

        // New ids continue after the largest imported id
        let node = store.create(create_url("2", "x", "https://x.com")).await.unwrap();
        assert_eq!(node.id.as_str(), "10");

        let err = store.remove(&BookmarkId::from("3")).await.unwrap_err();
        assert_eq!(rejection(err), ERR_MODIFY_ROOT);
    }

    #[test]
    fn test_load_chrome_json_rejects_duplicate_ids() {
        let json = CHROME_JSON.replace(r#""id": "9""#, r#""id": "5""#);
        let err = MemoryBookmarkStore::from_chrome_json(&json).err().unwrap();
        assert!(matches!(
            err,
            VBookmarksError::Validation { source: ValidationError::DuplicateId { .. } }
        ));
    }

    #[tokio::test]
    async fn test_load_chrome_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bookmarks");
        std::fs::write(&path, CHROME_JSON).unwrap();

        let store = MemoryBookmarkStore::from_chrome_bookmarks_file(&path).unwrap();
        assert_eq!(flatten(&store.get_tree().await.unwrap()).len(), 2);

        assert!(MemoryBookmarkStore::from_chrome_bookmarks_file(dir.path().join("missing")).is_err());
    }

    #[test]
    fn test_chrome_timestamp_parsing() {
        // 2024-01-01T00:00:00Z in Chrome's epoch
        assert_eq!(parse_chrome_timestamp("13348540800000000"), Some(1_704_067_200_000));
        assert_eq!(parse_chrome_timestamp("0"), None);
        assert_eq!(parse_chrome_timestamp("garbage"), None);
    }
}
