//! Bookmark Editor
//!
//! Controller behind the bookmark editor page. It owns the one mutable
//! copy of the application state (the flattened bookmarks of the current
//! load and the results computed from them) and runs the duplicate
//! grouper, the search ranker and the link validator over it.
//!
//! The bookmark store stays the source of truth: every mutation goes to
//! the store and is followed by a full reload, and results from a previous
//! load are dropped on reload.

use crate::duplicates::find_duplicates;
use crate::search::BookmarkSearchManager;
use browser_connector::{BookmarkStore, LinkValidator, ScanCancel, ValidationReport};
use data_access::{ExportDocument, MetadataStore};
use vbookmarks_core::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// State of the editor for the current load of the tree
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub bookmarks: Vec<BookmarkRecord>,
    pub duplicates: Option<DuplicateReport>,
    pub broken_links: Vec<LinkCheckResult>,
    pub last_scan: Option<ValidationReport>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Outcome of a bulk deletion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionSummary {
    pub deleted: Vec<BookmarkId>,
    /// Ids the store refused to delete, with its message
    pub failed: Vec<(BookmarkId, String)>,
}

impl DeletionSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct BookmarkEditor {
    store: Arc<dyn BookmarkStore>,
    validator: LinkValidator,
    metadata: Arc<MetadataStore>,
    search: BookmarkSearchManager,
    state: RwLock<EditorState>,
}

impl BookmarkEditor {
    pub fn new(
        store: Arc<dyn BookmarkStore>,
        validator: LinkValidator,
        metadata: Arc<MetadataStore>,
        search: BookmarkSearchManager,
    ) -> Self {
        Self {
            store,
            validator,
            metadata,
            search,
            state: RwLock::new(EditorState::default()),
        }
    }

    pub fn validator(&self) -> &LinkValidator {
        &self.validator
    }

    pub fn search_manager(&self) -> &BookmarkSearchManager {
        &self.search
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub async fn state(&self) -> EditorState {
        self.state.read().await.clone()
    }

    pub async fn bookmarks(&self) -> Vec<BookmarkRecord> {
        self.state.read().await.bookmarks.clone()
    }

    /// Fetch the tree from the store and start a new load cycle
    pub async fn reload(&self) -> Result<usize> {
        let tree = self.store.get_tree().await?;
        let records = flatten(&tree);
        ensure_unique_ids(&records)?;

        let count = records.len();
        self.search.update_index(records.clone()).await;
        *self.state.write().await = EditorState {
            bookmarks: records,
            loaded_at: Some(Utc::now()),
            ..Default::default()
        };

        info!("Loaded {} bookmarks", count);
        Ok(count)
    }

    /// Group the loaded bookmarks into duplicates
    pub async fn find_duplicates(&self) -> Result<DuplicateReport> {
        let mut state = self.state.write().await;
        let report = find_duplicates(&state.bookmarks)?;

        info!(
            "Found {} duplicate groups ({} deletion candidates)",
            report.total_groups(),
            report.deletion_candidates().len()
        );
        state.duplicates = Some(report.clone());
        Ok(report)
    }

    /// Probe every loaded bookmark; the broken ones are kept in the state
    pub async fn check_links(&self, cancel: &ScanCancel) -> Result<ValidationReport> {
        // The scan takes a while; don't hold the state across it
        let records = self.bookmarks().await;
        let report = self.validator.check_links_report(&records, cancel).await?;

        let mut state = self.state.write().await;
        if state.bookmarks == records {
            state.broken_links = report.broken.clone();
            state.last_scan = Some(report.clone());
        } else {
            debug!("Bookmarks reloaded during link check; results not kept");
        }
        Ok(report)
    }

    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        self.search.search(query).await
    }

    /// Count an open of the bookmark and return what to open
    pub async fn open_bookmark(&self, id: &BookmarkId) -> Result<(BookmarkRecord, BookmarkMetadata)> {
        let record = self
            .state
            .read()
            .await
            .bookmarks
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::rejected("open", "Can't find bookmark for id."))?;

        let metadata = self.metadata.record_click(id).await?;
        debug!("Opened bookmark {} ({} clicks)", id, metadata.click_count);
        Ok((record, metadata))
    }

    pub async fn create_bookmark(&self, details: CreateDetails) -> Result<BookmarkNode> {
        let node = self.store.create(details).await?;
        self.reload().await?;
        Ok(node)
    }

    pub async fn update_bookmark(&self, id: &BookmarkId, changes: BookmarkChanges) -> Result<BookmarkNode> {
        let node = self.store.update(id, changes).await?;
        self.reload().await?;
        Ok(node)
    }

    pub async fn move_bookmark(&self, id: &BookmarkId, destination: MoveDestination) -> Result<BookmarkNode> {
        let node = self.store.move_node(id, destination).await?;
        self.reload().await?;
        Ok(node)
    }

    /// Delete each id independently.
    ///
    /// A refused deletion is reported in the summary and does not stop the
    /// others. Metadata of deleted bookmarks is dropped and the tree is
    /// reloaded afterwards.
    pub async fn delete_bookmarks(&self, ids: &[BookmarkId]) -> Result<DeletionSummary> {
        let mut summary = DeletionSummary::default();
        let mut seen = HashSet::new();

        for id in ids.iter().filter(|id| seen.insert(*id)) {
            match self.store.remove(id).await {
                Ok(()) => summary.deleted.push(id.clone()),
                Err(VBookmarksError::Store { source }) => {
                    warn!("Failed to delete bookmark {}: {}", id, source);
                    summary.failed.push((id.clone(), source.host_message().to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        for id in &summary.deleted {
            self.metadata.remove(id).await?;
        }
        self.reload().await?;

        info!(
            "Deleted {} bookmarks ({} failed)",
            summary.deleted.len(),
            summary.failed.len()
        );
        Ok(summary)
    }

    /// Delete every non-keeper member of the last duplicate report
    pub async fn remove_duplicate_candidates(&self) -> Result<DeletionSummary> {
        let report = match self.state.read().await.duplicates.clone() {
            Some(report) => report,
            None => find_duplicates(&self.bookmarks().await)?,
        };
        self.delete_bookmarks(&report.deletion_candidates()).await
    }

    /// Delete every bookmark of the last link check that was not reachable
    pub async fn remove_broken_links(&self) -> Result<DeletionSummary> {
        let ids: Vec<BookmarkId> = self
            .state
            .read()
            .await
            .broken_links
            .iter()
            .map(|r| r.record.id.clone())
            .collect();
        self.delete_bookmarks(&ids).await
    }

    pub async fn export(&self) -> Result<ExportDocument> {
        let bookmarks = self.bookmarks().await;
        let metadata = self.metadata.snapshot().await;
        Ok(ExportDocument::new(bookmarks, metadata))
    }

    /// Replace the metadata table with the one from an export.
    ///
    /// Entries for bookmarks that are not in the current tree are skipped.
    /// Returns how many entries were imported.
    pub async fn import_metadata(&self, json: &str) -> Result<usize> {
        let document = ExportDocument::from_json(json)?;
        let live: HashSet<BookmarkId> = self.bookmarks().await.into_iter().map(|r| r.id).collect();

        let table: data_access::MetadataTable = document
            .metadata
            .into_iter()
            .filter(|(id, _)| live.contains(id))
            .collect();
        let imported = table.len();
        self.metadata.replace_all(table).await?;

        info!("Imported metadata for {} bookmarks", imported);
        Ok(imported)
    }

    /// Reload whenever the store reports a change.
    ///
    /// Events arriving together cause a single reload.
    pub fn spawn_reload_on_change(self: &Arc<Self>) -> JoinHandle<()> {
        let editor = Arc::clone(self);
        let mut events = self.store.subscribe();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                while let Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) = events.try_recv() {}

                if let Err(e) = editor.reload().await {
                    warn!("Reload after bookmark change failed: {}", e);
                }
            }
            debug!("Bookmark change listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfig;
    use async_trait::async_trait;
    use browser_connector::{
        BookmarkEvent, LinkProbe, LinkValidatorConfig, MemoryBookmarkStore, ProbeError,
    };
    use data_access::MemoryLocalStorage;
    use mockall::mock;
    use std::time::Duration;

    /// Probe answering 404 for URLs containing "gone"
    struct FakeProbe;

    #[async_trait]
    impl LinkProbe for FakeProbe {
        async fn head(&self, url: &str) -> std::result::Result<u16, ProbeError> {
            if url.contains("gone") {
                Ok(404)
            } else if url.contains("down") {
                Err(ProbeError::Network("connection refused".to_string()))
            } else {
                Ok(200)
            }
        }
    }

    async fn editor_with(store: Arc<dyn BookmarkStore>) -> BookmarkEditor {
        let validator = LinkValidator::with_config(
            Arc::new(FakeProbe),
            LinkValidatorConfig {
                batch_pause: Duration::from_millis(1),
                ..Default::default()
            },
        )
        .unwrap();
        let metadata = MetadataStore::load(Arc::new(MemoryLocalStorage::new())).await.unwrap();
        let search = BookmarkSearchManager::new(SearchConfig::default()).unwrap();
        BookmarkEditor::new(store, validator, Arc::new(metadata), search)
    }

    async fn seeded() -> (Arc<MemoryBookmarkStore>, BookmarkEditor) {
        let store = Arc::new(MemoryBookmarkStore::new());
        for (title, url) in [
            ("Rust", "https://rust-lang.org"),
            ("Rust", "http://www.rust-lang.org/"),
            ("Crates", "https://crates.io"),
            ("Gone", "https://gone.example"),
            ("Down", "https://down.example"),
        ] {
            store
                .create(CreateDetails {
                    title: title.to_string(),
                    url: Some(url.to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let editor = editor_with(store.clone()).await;
        editor.reload().await.unwrap();
        (store, editor)
    }

    fn id_of(editor_state: &EditorState, title: &str) -> BookmarkId {
        editor_state
            .bookmarks
            .iter()
            .find(|r| r.title == title)
            .map(|r| r.id.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_reload_flattens_tree() {
        let (_, editor) = seeded().await;
        let state = editor.state().await;
        assert_eq!(state.bookmarks.len(), 5);
        assert_eq!(state.bookmarks[0].path, vec!["Other bookmarks"]);
        assert!(state.loaded_at.is_some());
        assert_eq!(editor.search_manager().index_len().await, 5);
    }

    #[tokio::test]
    async fn test_find_and_remove_duplicates() {
        let (store, editor) = seeded().await;

        let report = editor.find_duplicates().await.unwrap();
        assert_eq!(report.exact_groups.len(), 1);
        assert_eq!(report.url_groups["rust-lang.org"].len(), 2);

        let summary = editor.remove_duplicate_candidates().await.unwrap();
        assert_eq!(summary.deleted.len(), 1);
        assert!(summary.is_complete());

        let remaining = flatten(&store.get_tree().await.unwrap());
        assert_eq!(remaining.len(), 4);
        assert_eq!(remaining.iter().filter(|r| r.title == "Rust").count(), 1);

        // Reload dropped the stale report
        assert!(editor.state().await.duplicates.is_none());
    }

    #[tokio::test]
    async fn test_check_and_remove_broken_links() {
        let (_, editor) = seeded().await;

        let report = editor.check_links(&ScanCancel::new()).await.unwrap();
        assert_eq!(report.checked, 5);
        assert_eq!(report.http_errors, 1);
        assert_eq!(report.network_failures, 1);
        assert_eq!(editor.state().await.broken_links.len(), 2);

        let summary = editor.remove_broken_links().await.unwrap();
        assert_eq!(summary.deleted.len(), 2);
        let titles: Vec<_> = editor.bookmarks().await.into_iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Rust", "Rust", "Crates"]);
    }

    #[tokio::test]
    async fn test_search_ranks_loaded_bookmarks() {
        let (_, editor) = seeded().await;
        let hits = editor.search("rust").await;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 18);
        assert!(editor.search("nothing here").await.is_empty());
    }

    #[tokio::test]
    async fn test_open_bookmark_counts_clicks() {
        let (_, editor) = seeded().await;
        let id = id_of(&editor.state().await, "Crates");

        editor.open_bookmark(&id).await.unwrap();
        let (record, meta) = editor.open_bookmark(&id).await.unwrap();
        assert_eq!(record.url, "https://crates.io");
        assert_eq!(meta.click_count, 2);

        let err = editor.open_bookmark(&BookmarkId::from("999")).await.unwrap_err();
        assert!(matches!(err, VBookmarksError::Store { .. }));
    }

    #[tokio::test]
    async fn test_crud_reloads() {
        let (_, editor) = seeded().await;

        let node = editor
            .create_bookmark(CreateDetails {
                parent_id: Some(BookmarkId::from("1")),
                index: None,
                title: "Tokio".to_string(),
                url: Some("https://tokio.rs".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(editor.bookmarks().await.len(), 6);

        editor
            .update_bookmark(&node.id, BookmarkChanges {
                title: Some("Tokio docs".to_string()),
                url: None,
            })
            .await
            .unwrap();
        let state = editor.state().await;
        assert_eq!(id_of(&state, "Tokio docs"), node.id);

        editor
            .move_bookmark(&node.id, MoveDestination {
                parent_id: Some(BookmarkId::from("2")),
                index: Some(0),
            })
            .await
            .unwrap();
        let first = editor.bookmarks().await.into_iter().next().unwrap();
        assert_eq!(first.id, node.id);
        assert_eq!(first.path, vec!["Other bookmarks"]);
    }

    #[tokio::test]
    async fn test_store_rejection_propagates() {
        let (_, editor) = seeded().await;
        let err = editor
            .update_bookmark(&BookmarkId::from("1"), BookmarkChanges {
                title: Some("x".to_string()),
                url: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, VBookmarksError::Store { .. }));
    }

    #[tokio::test]
    async fn test_delete_cleans_metadata() {
        let (_, editor) = seeded().await;
        let state = editor.state().await;
        let crates = id_of(&state, "Crates");
        let gone = id_of(&state, "Gone");

        editor.open_bookmark(&crates).await.unwrap();
        editor.open_bookmark(&gone).await.unwrap();
        editor.delete_bookmarks(&[gone.clone(), gone.clone()]).await.unwrap();

        assert!(editor.metadata().get(&gone).await.is_none());
        assert!(editor.metadata().get(&crates).await.is_some());
    }

    #[tokio::test]
    async fn test_export_and_import_metadata() {
        let (_, editor) = seeded().await;
        let crates = id_of(&editor.state().await, "Crates");
        editor.open_bookmark(&crates).await.unwrap();

        let mut document = editor.export().await.unwrap();
        assert_eq!(document.bookmarks.len(), 5);
        assert_eq!(document.metadata[&crates].click_count, 1);

        document.metadata.insert(BookmarkId::from("999"), BookmarkMetadata::default());
        document.metadata.get_mut(&crates).unwrap().click_count = 7;
        let imported = editor
            .import_metadata(&document.to_json_pretty().unwrap())
            .await
            .unwrap();

        assert_eq!(imported, 1);
        assert_eq!(editor.metadata().get(&crates).await.unwrap().click_count, 7);
        assert!(editor.metadata().get(&BookmarkId::from("999")).await.is_none());
    }

    #[tokio::test]
    async fn test_reload_on_store_change() {
        let (store, editor) = seeded().await;
        let editor = Arc::new(editor);
        let listener = editor.spawn_reload_on_change();

        store
            .create(CreateDetails {
                title: "New".to_string(),
                url: Some("https://new.example".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut reloaded = false;
        for _ in 0..100 {
            if editor.bookmarks().await.len() == 6 {
                reloaded = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(reloaded);
        listener.abort();
    }

    mock! {
        pub Store {}

        #[async_trait]
        impl BookmarkStore for Store {
            async fn get_tree(&self) -> Result<Vec<BookmarkNode>>;
            async fn create(&self, details: CreateDetails) -> Result<BookmarkNode>;
            async fn update(&self, id: &BookmarkId, changes: BookmarkChanges) -> Result<BookmarkNode>;
            async fn move_node(&self, id: &BookmarkId, destination: MoveDestination) -> Result<BookmarkNode>;
            async fn remove(&self, id: &BookmarkId) -> Result<()>;
            async fn remove_tree(&self, id: &BookmarkId) -> Result<()>;
            async fn search(&self, query: &str) -> Result<Vec<BookmarkNode>>;
            fn subscribe(&self) -> broadcast::Receiver<BookmarkEvent>;
        }
    }

    fn leaf(id: &str, title: &str, url: &str) -> BookmarkNode {
        BookmarkNode {
            id: BookmarkId::from(id),
            parent_id: Some(BookmarkId::from("0")),
            index: 0,
            title: title.to_string(),
            date_added: None,
            kind: NodeKind::Url {
                url: url.to_string(),
                date_last_used: None,
            },
        }
    }

    fn root(children: Vec<BookmarkNode>) -> Vec<BookmarkNode> {
        vec![BookmarkNode {
            id: BookmarkId::from("0"),
            parent_id: None,
            index: 0,
            title: String::new(),
            date_added: None,
            kind: NodeKind::Folder {
                children,
                date_group_modified: None,
            },
        }]
    }

    #[tokio::test]
    async fn test_delete_isolates_store_failures() {
        let mut store = MockStore::new();
        store.expect_get_tree().returning(|| {
            Ok(root(vec![
                leaf("10", "a", "https://a.com"),
                leaf("11", "a", "https://a.com"),
                leaf("12", "a", "https://a.com"),
            ]))
        });
        store.expect_remove().times(2).returning(|id| {
            if id.as_str() == "11" {
                Err(StoreError::rejected("remove", "Can't find bookmark for id.").into())
            } else {
                Ok(())
            }
        });

        let editor = editor_with(Arc::new(store)).await;
        editor.reload().await.unwrap();
        editor.find_duplicates().await.unwrap();

        let summary = editor.remove_duplicate_candidates().await.unwrap();
        assert_eq!(summary.deleted, vec![BookmarkId::from("12")]);
        assert_eq!(
            summary.failed,
            vec![(BookmarkId::from("11"), "Can't find bookmark for id.".to_string())]
        );
        assert!(!summary.is_complete());
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_previous_state() {
        let mut store = MockStore::new();
        let mut calls = 0;
        store.expect_get_tree().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(root(vec![leaf("10", "a", "https://a.com")]))
            } else {
                Err(StoreError::Unavailable {
                    reason: "extension context invalidated".to_string(),
                }
                .into())
            }
        });

        let editor = editor_with(Arc::new(store)).await;
        editor.reload().await.unwrap();
        assert!(editor.reload().await.is_err());
        assert_eq!(editor.bookmarks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_rejects_duplicate_ids() {
        let mut store = MockStore::new();
        store.expect_get_tree().returning(|| {
            Ok(root(vec![
                leaf("10", "a", "https://a.com"),
                leaf("10", "b", "https://b.com"),
            ]))
        });

        let editor = editor_with(Arc::new(store)).await;
        assert!(matches!(
            editor.reload().await,
            Err(VBookmarksError::Validation { .. })
        ));
    }
}
