/// Main application module
///
/// Provides the high-level Application API used by the editor page

use crate::{AppConfig, AppContext, AppStatistics, LoggerConfig, UnifiedLogger};
use anyhow::Context;
use bookmark_manager::{DeletionSummary, SearchSuggestion};
use browser_connector::{BookmarkStore, LinkProbe, ScanCancel, ScanState, ValidationReport};
use vbookmarks_core::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Main application
pub struct Application {
    /// Application context
    context: Arc<AppContext>,
    /// Scan currently running, with the generation that started it
    active_scan: Mutex<Option<(u64, ScanCancel)>>,
    scan_generation: Mutex<u64>,
    change_listener: Mutex<Option<JoinHandle<()>>>,
}

impl Application {
    /// Create and initialize a new application
    pub async fn new(config: AppConfig) -> Result<Self> {
        init_logging(&config);
        info!("Starting VBookmarks");

        let context = AppContext::new(config).await?;
        Self::start(context).await
    }

    /// Create the application from a JSON configuration file
    pub async fn from_config_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let config = AppConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        let app = Self::new(config).await.context("failed to start VBookmarks")?;
        Ok(app)
    }

    /// Create the application around an existing store and link probe
    pub async fn with_components(
        config: AppConfig,
        store: Arc<dyn BookmarkStore>,
        probe: Arc<dyn LinkProbe>,
    ) -> Result<Self> {
        init_logging(&config);
        let context = AppContext::with_components(config, store, probe).await?;
        Self::start(context).await
    }

    async fn start(context: AppContext) -> Result<Self> {
        let app = Self {
            context: Arc::new(context),
            active_scan: Mutex::new(None),
            scan_generation: Mutex::new(0),
            change_listener: Mutex::new(None),
        };

        app.reload().await?;
        app.prune_local_state().await?;
        *app.change_listener.lock().await = Some(app.context.editor.spawn_reload_on_change());

        info!("Application initialized successfully");
        Ok(app)
    }

    /// Drop metadata and expanded-folder state of nodes that no longer exist
    async fn prune_local_state(&self) -> Result<()> {
        let tree = self.context.store.get_tree().await?;
        let live_folders: HashSet<BookmarkId> = folder_ids(&tree).into_iter().collect();
        let live_bookmarks: HashSet<BookmarkId> = flatten(&tree).into_iter().map(|r| r.id).collect();

        let dropped = self.context.metadata.retain_only(&live_bookmarks).await?;
        self.context.view_state.retain_only(&live_folders).await?;
        if dropped > 0 {
            info!("Dropped metadata of {} removed bookmarks", dropped);
        }
        Ok(())
    }

    /// Record a failure with the error handler before handing it back
    async fn observe<T>(&self, operation: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.context.error_handler.handle_error(e, operation).await;
        }
        result
    }

    /// Shutdown the application
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down application");
        self.cancel_link_check().await;
        if let Some(listener) = self.change_listener.lock().await.take() {
            listener.abort();
        }
        info!("Application shutdown complete");
        Ok(())
    }

    /// Get application context
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    // High-level API methods

    pub async fn reload(&self) -> Result<usize> {
        let result = self.context.editor.reload().await;
        self.observe("reload", result).await
    }

    pub async fn bookmarks(&self) -> Vec<BookmarkRecord> {
        self.context.editor.bookmarks().await
    }

    pub async fn find_duplicates(&self) -> Result<DuplicateReport> {
        let result = self.context.editor.find_duplicates().await;
        self.observe("find_duplicates", result).await
    }

    /// Check every loaded bookmark; starting a check cancels one in flight
    pub async fn check_links(&self) -> Result<ValidationReport> {
        let cancel = ScanCancel::new();
        let generation = {
            let mut counter = self.scan_generation.lock().await;
            *counter += 1;
            *counter
        };
        if let Some((_, previous)) = self
            .active_scan
            .lock()
            .await
            .replace((generation, cancel.clone()))
        {
            debug!("Cancelling previous link check");
            previous.cancel();
        }

        let result = self.context.editor.check_links(&cancel).await;

        let mut active = self.active_scan.lock().await;
        if matches!(*active, Some((current, _)) if current == generation) {
            *active = None;
        }
        drop(active);

        self.observe("check_links", result).await
    }

    /// Cancel the running link check, if any
    pub async fn cancel_link_check(&self) -> bool {
        match self.active_scan.lock().await.take() {
            Some((_, cancel)) => {
                cancel.cancel();
                info!("Link check cancelled");
                true
            }
            None => false,
        }
    }

    /// Watch link check progress
    pub fn scan_progress(&self) -> watch::Receiver<ScanState> {
        self.context.editor.validator().subscribe()
    }

    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        self.context.editor.search(query).await
    }

    /// Search from the search box; `None` when a newer keystroke superseded this one
    pub async fn search_debounced(&self, query: &str) -> Option<Vec<SearchHit>> {
        self.context.editor.search_manager().search_debounced(query).await
    }

    pub async fn suggestions(&self, partial_query: &str) -> Vec<SearchSuggestion> {
        self.context.editor.search_manager().get_suggestions(partial_query).await
    }

    pub async fn open_bookmark(&self, id: &BookmarkId) -> Result<(BookmarkRecord, BookmarkMetadata)> {
        let result = self.context.editor.open_bookmark(id).await;
        self.observe("open_bookmark", result).await
    }

    pub async fn delete_bookmarks(&self, ids: &[BookmarkId]) -> Result<DeletionSummary> {
        let result = self.context.editor.delete_bookmarks(ids).await;
        self.observe("delete_bookmarks", result).await
    }

    /// Delete every duplicate except the first bookmark of each group
    pub async fn remove_duplicates(&self) -> Result<DeletionSummary> {
        let result = self.context.editor.remove_duplicate_candidates().await;
        self.observe("remove_duplicates", result).await
    }

    pub async fn remove_broken_links(&self) -> Result<DeletionSummary> {
        let result = self.context.editor.remove_broken_links().await;
        self.observe("remove_broken_links", result).await
    }

    /// Write an export of the bookmarks and their metadata into `dir`
    pub async fn export_to_file(&self, dir: &Path) -> Result<PathBuf> {
        let result = async {
            let document = self.context.editor.export().await?;
            let path = dir.join(document.file_name());
            tokio::fs::write(&path, document.to_json_pretty()?).await?;
            info!("Exported {} bookmarks to {}", document.bookmarks.len(), path.display());
            Ok(path)
        }
        .await;
        self.observe("export", result).await
    }

    pub async fn import_metadata_from_file(&self, path: &Path) -> Result<usize> {
        let result = async {
            let json = tokio::fs::read_to_string(path).await?;
            self.context.editor.import_metadata(&json).await
        }
        .await;
        self.observe("import_metadata", result).await
    }

    /// Flip a folder between expanded and collapsed; returns the new state
    pub async fn toggle_folder(&self, id: &BookmarkId) -> Result<bool> {
        let result = self.context.view_state.toggle(id).await;
        self.observe("toggle_folder", result).await
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> AppStatistics {
        self.context.get_stats().await
    }
}

/// Install the global logger unless one is already in place
fn init_logging(config: &AppConfig) {
    if let Err(e) = UnifiedLogger::init(LoggerConfig::with_level(config.log_level.clone())) {
        debug!("Keeping existing logger: {:#}", e);
    }
}
