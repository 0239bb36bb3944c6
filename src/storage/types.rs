use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Store errors with user-friendly messages.
///
/// Only `InstanceLocked` and `Migration` are fatal at startup; write errors
/// surface as `Other` and are handled per-row by the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another instance of the application has locked the database
    #[error("Another instance of tidings appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        // SQLITE_CANTOPEN (14): unable to open database file
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
            || error_string.contains("unable to open database file")
        {
            return StoreError::InstanceLocked;
        }

        StoreError::Other(err)
    }
}

// ============================================================================
// Helper Types
// ============================================================================

/// A reconciled feed item ready for insertion.
///
/// `published` is unix seconds; the engine has already applied the
/// published → updated → fetch-time fallback before building this.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub feed: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub display_name: String,
    pub published: i64,
}

/// Internal row type for article queries (used by sqlx FromRow).
/// Converts to ArticleRecord via into_record() with Arc wrapping.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ArticleDbRow {
    pub id: i64,
    pub feed: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub read: bool,
    pub display_name: String,
    pub deleted: bool,
    pub published: i64,
}

impl ArticleDbRow {
    pub(crate) fn into_record(self) -> ArticleRecord {
        ArticleRecord {
            id: self.id,
            feed: Arc::from(self.feed),
            title: Arc::from(self.title),
            content: Arc::from(self.content),
            link: Arc::from(self.link),
            read: self.read,
            display_name: Arc::from(self.display_name),
            deleted: self.deleted,
            published: self.published,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Article row as loaded from the store.
///
/// String fields use `Arc<str>` for cheap cloning into the engine's
/// in-memory set and projection snapshots. `deleted` is always false for
/// rows returned by `scan_all` (soft-deleted rows are filtered in SQL) but
/// kept so direct row inspection in tests sees the full durable state.
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub feed: Arc<str>,
    pub title: Arc<str>,
    pub content: Arc<str>,
    pub link: Arc<str>,
    pub read: bool,
    pub display_name: Arc<str>,
    pub deleted: bool,
    pub published: i64,
}
