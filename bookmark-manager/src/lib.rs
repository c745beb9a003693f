//! Bookmark Manager for VBookmarks
//!
//! This module provides the bookmark editor's logic on top of the bookmark
//! store: duplicate detection, search ranking, and the editor controller
//! that owns the loaded bookmarks and applies the user's clean-up actions.
//!
//! # Features
//! - Duplicate groups by URL, title, or both, with severity tiers
//! - Additive relevance scoring with stable ranking
//! - Debounced search with capped history and suggestions
//! - Bulk deletion with per-bookmark failure isolation

pub mod duplicates;
pub mod search;
pub mod editor;

pub use duplicates::find_duplicates;
pub use search::*;
pub use editor::*;

// Re-export commonly used types
pub use vbookmarks_core::*;
