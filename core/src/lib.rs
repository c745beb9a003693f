//! Core types for VBookmarks
//!
//! Shared data model, error taxonomy and the string normalizers used to
//! compare bookmarks with each other and with search queries.

pub mod types;
pub mod errors;
pub mod normalize;
pub mod tree;

pub use types::*;
pub use errors::*;
pub use normalize::{normalize_query, normalize_title, normalize_url};
pub use tree::{flatten, folder_ids};

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
