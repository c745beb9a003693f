//! Bookmark Search Module
//!
//! Scores bookmarks against a free-text query and ranks them, and keeps
//! the in-memory search index, search history and keystroke debouncing
//! for the search box.
//!
//! Scoring is additive:
//! - title contains the query: +10
//! - title starts with the query: +5 more
//! - URL contains the query: +3
//!
//! Records matching neither title nor URL are not results at all.

use vbookmarks_core::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

pub const TITLE_CONTAINS_SCORE: u32 = 10;
pub const TITLE_PREFIX_BONUS: u32 = 5;
pub const URL_CONTAINS_SCORE: u32 = 3;

/// Maximum number of search suggestions to return
const MAX_SUGGESTIONS: usize = 10;

/// Relevance of `record` for an already normalized query; 0 means no match
pub fn score(record: &BookmarkRecord, normalized_query: &str) -> u32 {
    let title = normalize_title(&record.title);
    let url = normalize_url(&record.url);

    let mut total = 0;
    if title.contains(normalized_query) {
        total += TITLE_CONTAINS_SCORE;
        if title.starts_with(normalized_query) {
            total += TITLE_PREFIX_BONUS;
        }
    }
    if url.contains(normalized_query) {
        total += URL_CONTAINS_SCORE;
    }
    total
}

/// Matching records by descending score, ties in input order.
///
/// A blank query matches nothing.
pub fn rank(records: &[BookmarkRecord], query: &str, limit: usize) -> Vec<SearchHit> {
    let query = normalize_query(query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = records
        .iter()
        .filter_map(|record| {
            let score = score(record, &query);
            (score > 0).then(|| SearchHit {
                record: record.clone(),
                score,
            })
        })
        .collect();

    // sort_by is stable, which keeps equal scores in input order
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}

/// Search box behaviour
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce: Duration,
    pub max_results: usize,
    pub history_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_results: 100,
            history_size: 100,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.max_results == 0 {
            return Err(ValidationError::InvalidValue {
                field: "max_results".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Search history entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    /// The search query
    pub query: String,
    /// When the search was performed
    pub searched_at: DateTime<Utc>,
    /// Number of results returned
    pub result_count: usize,
}

/// Search suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub query: String,
    pub suggestion_type: SuggestionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionType {
    /// From search history
    History,
    /// From bookmark titles
    Title,
}

/// Search over the currently loaded bookmarks
pub struct BookmarkSearchManager {
    config: SearchConfig,
    index: RwLock<Vec<BookmarkRecord>>,
    /// Most recent first
    history: RwLock<VecDeque<SearchHistoryEntry>>,
    /// Bumped by every debounced search; only the newest may finish
    generation: AtomicU64,
}

impl BookmarkSearchManager {
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            index: RwLock::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Replace the index after a reload
    pub async fn update_index(&self, records: Vec<BookmarkRecord>) {
        debug!("Search index updated with {} bookmarks", records.len());
        *self.index.write().await = records;
    }

    pub async fn index_len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Rank the index for `query` and remember the query
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        let hits = {
            let index = self.index.read().await;
            rank(&index, query, self.config.max_results)
        };

        if !normalize_query(query).is_empty() {
            self.record_search(query.trim(), hits.len()).await;
        }
        hits
    }

    /// Search after the debounce delay.
    ///
    /// Returns `None` when a newer call arrived during the delay; only the
    /// last query of a burst produces results.
    pub async fn search_debounced(&self, query: &str) -> Option<Vec<SearchHit>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.config.debounce).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!("Search for {:?} superseded", query);
            return None;
        }
        Some(self.search(query).await)
    }

    /// Record a search in history
    async fn record_search(&self, query: &str, result_count: usize) {
        let mut history = self.history.write().await;

        // Remove duplicate queries (keep most recent)
        let lowered = query.to_lowercase();
        history.retain(|e| e.query.to_lowercase() != lowered);

        history.push_front(SearchHistoryEntry {
            query: query.to_string(),
            searched_at: Utc::now(),
            result_count,
        });
        history.truncate(self.config.history_size);
    }

    /// Get search history, most recent first
    pub async fn get_search_history(&self, limit: usize) -> Vec<SearchHistoryEntry> {
        self.history.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn clear_search_history(&self) {
        self.history.write().await.clear();
    }

    /// Get search suggestions based on partial query
    pub async fn get_suggestions(&self, partial_query: &str) -> Vec<SearchSuggestion> {
        let query = normalize_query(partial_query);
        if query.is_empty() {
            return Vec::new();
        }
        let mut suggestions = Vec::new();

        for entry in self.history.read().await.iter() {
            if normalize_query(&entry.query).starts_with(&query) {
                suggestions.push(SearchSuggestion {
                    query: entry.query.clone(),
                    suggestion_type: SuggestionType::History,
                });
            }
        }

        for record in self.index.read().await.iter() {
            if normalize_title(&record.title).contains(&query) {
                suggestions.push(SearchSuggestion {
                    query: record.title.trim().to_string(),
                    suggestion_type: SuggestionType::Title,
                });
            }
        }

        let mut seen = HashSet::new();
        suggestions.retain(|s| seen.insert(s.query.to_lowercase()));
        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }
}
