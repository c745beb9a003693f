use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use crate::errors::ValidationError;

/// Opaque bookmark identifier assigned by the bookmark store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub String);

impl BookmarkId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BookmarkId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for BookmarkId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A node of the bookmark tree as handed out by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    pub id: BookmarkId,
    pub parent_id: Option<BookmarkId>,
    pub index: usize,
    pub title: String,
    /// Milliseconds since the Unix epoch
    pub date_added: Option<i64>,
    pub kind: NodeKind,
}

/// Folder or URL-bearing leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Folder {
        children: Vec<BookmarkNode>,
        date_group_modified: Option<i64>,
    },
    #[serde(rename_all = "camelCase")]
    Url {
        url: String,
        date_last_used: Option<i64>,
    },
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Url { url, .. } => Some(url),
            NodeKind::Folder { .. } => None,
        }
    }

    pub fn children(&self) -> &[BookmarkNode] {
        match &self.kind {
            NodeKind::Folder { children, .. } => children,
            NodeKind::Url { .. } => &[],
        }
    }
}

/// Flattened, read-only view of a URL bookmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
    pub id: BookmarkId,
    pub title: String,
    pub url: String,
    /// Ancestor folder titles, outermost first
    pub path: Vec<String>,
    pub date_added: Option<i64>,
    pub date_last_used: Option<i64>,
}

impl BookmarkRecord {
    pub fn new(id: impl Into<BookmarkId>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            path: Vec::new(),
            date_added: None,
            date_last_used: None,
        }
    }

    pub fn with_path(mut self, path: Vec<String>) -> Self {
        self.path = path;
        self
    }

    pub fn display_path(&self) -> String {
        self.path.join(" > ")
    }
}

/// Check that every record has a non-empty id and no id repeats.
///
/// Ids are only unique within one load of the tree, so this is checked
/// per input rather than remembered across calls.
pub fn ensure_unique_ids(records: &[BookmarkRecord]) -> std::result::Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if record.id.as_str().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !seen.insert(&record.id) {
            return Err(ValidationError::DuplicateId {
                id: record.id.to_string(),
            });
        }
    }
    Ok(())
}

/// Which normalized key a duplicate group matched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DuplicateKind {
    Url,
    Title,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity tier for a bucket of `size` members
    pub fn for_group_size(size: usize) -> Self {
        if size >= 5 {
            Severity::High
        } else if size >= 3 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// A bucket of two or more bookmarks sharing a normalized key.
///
/// `members` keeps input order; the first member is the recommended keeper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub group_kind: DuplicateKind,
    pub key: String,
    pub members: Vec<BookmarkRecord>,
    pub severity: Severity,
}

impl DuplicateGroup {
    pub fn keeper(&self) -> Option<&BookmarkRecord> {
        self.members.first()
    }

    pub fn deletion_candidates(&self) -> &[BookmarkRecord] {
        self.members.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of one duplicate scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub url_groups: BTreeMap<String, DuplicateGroup>,
    pub title_groups: BTreeMap<String, DuplicateGroup>,
    pub exact_groups: BTreeMap<String, DuplicateGroup>,
}

impl DuplicateReport {
    pub fn total_groups(&self) -> usize {
        self.url_groups.len() + self.title_groups.len() + self.exact_groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_groups() == 0
    }

    pub fn groups(&self) -> impl Iterator<Item = &DuplicateGroup> {
        self.exact_groups
            .values()
            .chain(self.url_groups.values())
            .chain(self.title_groups.values())
    }

    /// Ids of every non-keeper member across all groups, first-seen order.
    ///
    /// A bookmark that is the keeper of any group is never returned, so
    /// applying the result cannot delete every copy of a bookmark.
    pub fn deletion_candidates(&self) -> Vec<BookmarkId> {
        let keepers: HashSet<&BookmarkId> = self
            .groups()
            .filter_map(|g| g.keeper().map(|k| &k.id))
            .collect();

        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for group in self.groups() {
            for member in group.deletion_candidates() {
                if !keepers.contains(&member.id) && seen.insert(member.id.clone()) {
                    ids.push(member.id.clone());
                }
            }
        }
        ids
    }
}

/// Classified outcome of a single link probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkOutcome {
    Reachable,
    HttpError(u16),
    NetworkFailure,
    Timeout,
}

impl LinkOutcome {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=399 => LinkOutcome::Reachable,
            _ => LinkOutcome::HttpError(status),
        }
    }

    pub fn is_broken(&self) -> bool {
        !matches!(self, LinkOutcome::Reachable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheckResult {
    pub record: BookmarkRecord,
    pub outcome: LinkOutcome,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub record: BookmarkRecord,
    pub score: u32,
}

/// Locally kept per-bookmark metadata, keyed by bookmark id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkMetadata {
    pub click_count: u64,
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub custom_notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rating: f64,
}

impl Default for BookmarkMetadata {
    fn default() -> Self {
        Self {
            click_count: 0,
            last_accessed: None,
            custom_notes: String::new(),
            tags: Vec::new(),
            rating: 0.0,
        }
    }
}

/// Input for creating a bookmark or folder (folder when `url` is `None`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDetails {
    pub parent_id: Option<BookmarkId>,
    pub index: Option<usize>,
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkChanges {
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDestination {
    pub parent_id: Option<BookmarkId>,
    pub index: Option<usize>,
}
