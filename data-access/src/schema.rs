//! Database schema definitions and migrations

/// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the VBookmarks local storage database
pub const SCHEMA_SQL: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL,
    description TEXT
);

-- Key/value local storage, one JSON document per key
CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Records the current version; a no-op once applied
pub const RECORD_VERSION_SQL: &str = r#"
INSERT OR IGNORE INTO schema_migrations (version, applied_at, description)
VALUES (?1, ?2, 'local storage')
"#;
