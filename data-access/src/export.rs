//! Export file format

use crate::metadata::MetadataTable;
use vbookmarks_core::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format version written into every export
pub const EXPORT_VERSION: &str = "1.0";

/// User-facing JSON download of all bookmarks and their metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub bookmarks: Vec<BookmarkRecord>,
    pub metadata: MetadataTable,
    pub export_date: DateTime<Utc>,
    pub version: String,
}

impl ExportDocument {
    pub fn new(bookmarks: Vec<BookmarkRecord>, metadata: MetadataTable) -> Self {
        Self {
            bookmarks,
            metadata,
            export_date: Utc::now(),
            version: EXPORT_VERSION.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export, rejecting versions this build does not write
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        if document.version != EXPORT_VERSION {
            return Err(ValidationError::InvalidValue {
                field: "version".to_string(),
                reason: format!("unsupported export version {}", document.version),
            }
            .into());
        }
        Ok(document)
    }

    /// Default download name, e.g. `vbookmarks-export-2024-05-01.json`
    pub fn file_name(&self) -> String {
        format!("vbookmarks-export-{}.json", self.export_date.format("%Y-%m-%d"))
    }
}
