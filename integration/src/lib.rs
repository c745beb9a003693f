/// Integration module for VBookmarks
///
/// Loads the configuration, builds every component from it and wires them
/// together behind the `Application` API.

use vbookmarks_core::errors::{Result, SystemError};
use browser_connector::{
    open_bookmark_store, BookmarkStore, HttpLinkProbe, HttpProbeConfig, LinkProbe, LinkValidator,
    LinkValidatorConfig,
};
use bookmark_manager::{BookmarkEditor, BookmarkSearchManager, SearchConfig};
use data_access::{DatabaseManager, LocalStorage, MemoryLocalStorage, MetadataStore, ViewStateStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

pub mod application;
pub mod error_handler;
pub mod logger;

pub use application::Application;
pub use error_handler::{ErrorEntry, ErrorSeverity, ErrorStatistics, UnifiedErrorHandler};
pub use logger::{LoggerConfig, UnifiedLogger};

/// Link checker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkCheckSettings {
    /// Probes in flight at once
    pub batch_size: usize,
    pub request_timeout_secs: u64,
    /// Pause between batches
    pub batch_pause_ms: u64,
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for LinkCheckSettings {
    fn default() -> Self {
        let probe = HttpProbeConfig::default();
        Self {
            batch_size: 5,
            request_timeout_secs: 10,
            batch_pause_ms: 1000,
            user_agent: probe.user_agent,
            max_redirects: probe.max_redirects,
        }
    }
}

impl LinkCheckSettings {
    pub fn validator_config(&self) -> LinkValidatorConfig {
        LinkValidatorConfig {
            batch_size: self.batch_size,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            batch_pause: Duration::from_millis(self.batch_pause_ms),
        }
    }

    pub fn probe_config(&self) -> HttpProbeConfig {
        HttpProbeConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
            max_redirects: self.max_redirects,
        }
    }
}

/// Search box settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub max_results: usize,
    pub history_size: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_results: 100,
            history_size: 100,
        }
    }
}

impl SearchSettings {
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            max_results: self.max_results,
            history_size: self.history_size,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file backing local storage; in memory when absent
    pub storage_path: Option<PathBuf>,

    /// Chrome `Bookmarks` file to load; the default profile is tried when absent
    pub bookmarks_file: Option<PathBuf>,

    /// Log level
    pub log_level: String,

    pub link_check: LinkCheckSettings,

    pub search: SearchSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_path: None,
            bookmarks_file: None,
            log_level: "info".to_string(),
            link_check: LinkCheckSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |details: &str| -> Result<()> {
            Err(SystemError::Configuration {
                details: details.to_string(),
            }
            .into())
        };

        if self.link_check.batch_size == 0 {
            return invalid("link_check.batch_size must be at least 1");
        }
        if self.link_check.request_timeout_secs == 0 {
            return invalid("link_check.request_timeout_secs must be greater than zero");
        }
        if self.search.max_results == 0 {
            return invalid("search.max_results must be at least 1");
        }
        if tracing_subscriber::EnvFilter::try_new(&self.log_level).is_err() {
            return invalid("log_level is not a valid log filter");
        }
        Ok(())
    }
}

/// Application context that holds all initialized components
pub struct AppContext {
    /// Host bookmark store
    pub store: Arc<dyn BookmarkStore>,

    /// Database backing local storage, when configured
    pub database: Option<Arc<DatabaseManager>>,

    pub storage: Arc<dyn LocalStorage>,

    pub metadata: Arc<MetadataStore>,

    pub view_state: Arc<ViewStateStore>,

    /// Bookmark editor controller
    pub editor: Arc<BookmarkEditor>,

    /// Unified error handler
    pub error_handler: Arc<UnifiedErrorHandler>,

    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,
}

impl AppContext {
    /// Create a new application context with all components initialized
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store = open_bookmark_store(config.bookmarks_file.as_deref())?;
        let probe = Arc::new(HttpLinkProbe::with_config(config.link_check.probe_config()));
        Self::with_components(config, store, probe).await
    }

    /// Create a context around an existing store and link probe
    pub async fn with_components(
        config: AppConfig,
        store: Arc<dyn BookmarkStore>,
        probe: Arc<dyn LinkProbe>,
    ) -> Result<Self> {
        info!("Initializing application context");
        config.validate()?;

        // Initialize local storage
        let database = match &config.storage_path {
            Some(path) => Some(Arc::new(DatabaseManager::new(path).await?)),
            None => None,
        };
        let storage: Arc<dyn LocalStorage> = match &database {
            Some(database) => Arc::new(database.local_storage()),
            None => Arc::new(MemoryLocalStorage::new()),
        };
        info!("Local storage initialized");

        let metadata = Arc::new(MetadataStore::load(storage.clone()).await?);
        let view_state = Arc::new(ViewStateStore::load(storage.clone()).await?);

        let validator = LinkValidator::with_config(probe, config.link_check.validator_config())?;
        let search = BookmarkSearchManager::new(config.search.search_config())?;
        let editor = Arc::new(BookmarkEditor::new(store.clone(), validator, metadata.clone(), search));
        info!("Bookmark editor initialized");

        // Initialize error handler
        let error_handler = Arc::new(UnifiedErrorHandler::new());

        info!("Application context initialized successfully");

        Ok(Self {
            store,
            database,
            storage,
            metadata,
            view_state,
            editor,
            error_handler,
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Get application statistics
    pub async fn get_stats(&self) -> AppStatistics {
        let state = self.editor.state().await;
        AppStatistics {
            total_bookmarks: state.bookmarks.len(),
            duplicate_groups: state.duplicates.map(|r| r.total_groups()).unwrap_or(0),
            broken_links: state.broken_links.len(),
            metadata_entries: self.metadata.len().await,
            expanded_folders: self.view_state.expanded().await.len(),
        }
    }
}

/// Application statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatistics {
    pub total_bookmarks: usize,
    pub duplicate_groups: usize,
    pub broken_links: usize,
    pub metadata_entries: usize,
    pub expanded_folders: usize,
}
