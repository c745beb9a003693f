//! Browser Connector module for VBookmarks
//!
//! This module provides the connection between the bookmark manager and the
//! browser: the async bookmark store contract, an in-memory store that can
//! be seeded from a Chrome `Bookmarks` file, and the link validator that
//! probes bookmark URLs over HTTP.
//!
//! # Features
//! - `BookmarkStore` trait with change notifications
//! - Chrome `Bookmarks` JSON loading
//! - Batched, bounded-concurrency link checking with cancellation

pub mod traits;
pub mod memory_store;
pub mod link_validator;

pub use traits::*;
pub use memory_store::{default_chrome_bookmarks_path, MemoryBookmarkStore};
pub use link_validator::{
    HttpLinkProbe, HttpProbeConfig, LinkProbe, LinkValidator, LinkValidatorConfig, ProbeError,
    ScanCancel, ScanState, ValidationReport,
};

use vbookmarks_core::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the bookmark store for a profile.
///
/// With an explicit path the file must load. Without one the default
/// Chrome profile is tried, and a missing or unreadable file falls back to
/// an empty store.
pub fn open_bookmark_store(path: Option<&Path>) -> Result<Arc<MemoryBookmarkStore>> {
    if let Some(path) = path {
        info!("Loading bookmarks from {}", path.display());
        return Ok(Arc::new(MemoryBookmarkStore::from_chrome_bookmarks_file(path)?));
    }

    match default_chrome_bookmarks_path() {
        Some(path) if path.exists() => match MemoryBookmarkStore::from_chrome_bookmarks_file(&path) {
            Ok(store) => {
                info!("Loaded Chrome bookmarks from {}", path.display());
                Ok(Arc::new(store))
            }
            Err(e) => {
                warn!("Failed to load {}: {}; starting empty", path.display(), e);
                Ok(Arc::new(MemoryBookmarkStore::new()))
            }
        },
        _ => {
            info!("No Chrome bookmarks file found; starting with an empty store");
            Ok(Arc::new(MemoryBookmarkStore::new()))
        }
    }
}
