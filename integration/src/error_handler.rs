/// Unified error handler for centralized error management

use vbookmarks_core::errors::{StoreError, SystemError, VBookmarksError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn, info};

const MAX_RECENT_ERRORS: usize = 100;

/// Error severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// Local state may be inconsistent
    Critical,
    /// An operation failed
    Error,
    /// The host is temporarily out of reach
    Warning,
    Info,
}

/// Error entry for tracking
#[derive(Debug, Clone)]
pub struct ErrorEntry {
    pub error: String,
    pub severity: ErrorSeverity,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub context: String,
}

/// Unified error handler
pub struct UnifiedErrorHandler {
    /// Recent errors for reporting
    recent_errors: Arc<RwLock<Vec<ErrorEntry>>>,
    /// Maximum number of errors to keep
    max_errors: usize,
}

impl UnifiedErrorHandler {
    pub fn new() -> Self {
        Self::with_capacity(MAX_RECENT_ERRORS)
    }

    pub fn with_capacity(max_errors: usize) -> Self {
        Self {
            recent_errors: Arc::new(RwLock::new(Vec::new())),
            max_errors: max_errors.max(1),
        }
    }

    /// Handle an error with automatic logging
    pub async fn handle_error(&self, error: &VBookmarksError, context: &str) -> ErrorSeverity {
        let severity = classify_error(error);

        match severity {
            ErrorSeverity::Critical => {
                error!("CRITICAL ERROR in {}: {}", context, error);
            }
            ErrorSeverity::Error => {
                error!("ERROR in {}: {}", context, error);
            }
            ErrorSeverity::Warning => {
                warn!("WARNING in {}: {}", context, error);
            }
            ErrorSeverity::Info => {
                info!("INFO in {}: {}", context, error);
            }
        }

        let entry = ErrorEntry {
            error: error.to_string(),
            severity,
            timestamp: chrono::Utc::now(),
            context: context.to_string(),
        };

        self.add_error_entry(entry).await;
        severity
    }

    async fn add_error_entry(&self, entry: ErrorEntry) {
        let mut errors = self.recent_errors.write().await;
        errors.push(entry);

        if errors.len() > self.max_errors {
            let excess = errors.len() - self.max_errors;
            errors.drain(0..excess);
        }
    }

    /// Get recent errors, oldest first
    pub async fn get_recent_errors(&self) -> Vec<ErrorEntry> {
        self.recent_errors.read().await.clone()
    }

    pub async fn get_error_stats(&self) -> ErrorStatistics {
        let errors = self.recent_errors.read().await;

        let mut stats = ErrorStatistics {
            total: errors.len(),
            ..Default::default()
        };

        for error in errors.iter() {
            match error.severity {
                ErrorSeverity::Critical => stats.critical += 1,
                ErrorSeverity::Error => stats.errors += 1,
                ErrorSeverity::Warning => stats.warnings += 1,
                ErrorSeverity::Info => stats.info += 1,
            }
        }

        stats
    }

    pub async fn clear_errors(&self) {
        self.recent_errors.write().await.clear();
    }
}

impl Default for UnifiedErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify error severity
pub fn classify_error(error: &VBookmarksError) -> ErrorSeverity {
    match error {
        VBookmarksError::Store { source } => match source {
            StoreError::Rejected { .. } => ErrorSeverity::Error,
            StoreError::Unavailable { .. } => ErrorSeverity::Warning,
        },
        VBookmarksError::Validation { .. } => ErrorSeverity::Critical,
        VBookmarksError::System { source } => match source {
            SystemError::Configuration { .. } => ErrorSeverity::Error,
            _ => ErrorSeverity::Critical,
        },
    }
}

/// Error statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorStatistics {
    pub total: usize,
    pub critical: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}
