use thiserror::Error;

/// Errors reported by the host bookmark store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation} rejected by bookmark store: {message}")]
    Rejected { operation: String, message: String },

    #[error("Bookmark store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// The host's own message, without the operation prefix
    pub fn host_message(&self) -> &str {
        match self {
            Self::Rejected { message, .. } => message,
            Self::Unavailable { reason } => reason,
        }
    }
}

/// Malformed input handed to a core component.
///
/// These are programmer errors: they are surfaced to the caller as-is and
/// never recovered from inside the core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Bookmark record has an empty id")]
    EmptyId,

    #[error("Bookmark id {id} appears more than once in the input")]
    DuplicateId { id: String },

    #[error("Bookmark {id} has no URL (folders cannot be processed)")]
    MissingUrl { id: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// General system errors
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Configuration error: {details}")]
    Configuration { details: String },

    #[error("IO error: {source}")]
    IO {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Storage error: {details}")]
    Storage { details: String },
}

/// Main error type for VBookmarks
#[derive(Debug, Error)]
pub enum VBookmarksError {
    #[error("Bookmark store error: {source}")]
    Store {
        #[from]
        source: StoreError,
    },

    #[error("Validation error: {source}")]
    Validation {
        #[from]
        source: ValidationError,
    },

    #[error("System error: {source}")]
    System {
        #[from]
        source: SystemError,
    },
}

impl From<std::io::Error> for VBookmarksError {
    fn from(e: std::io::Error) -> Self {
        VBookmarksError::System {
            source: SystemError::IO { source: e },
        }
    }
}

impl From<serde_json::Error> for VBookmarksError {
    fn from(e: serde_json::Error) -> Self {
        VBookmarksError::System {
            source: SystemError::Serialization { source: e },
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, VBookmarksError>;
