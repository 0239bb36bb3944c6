//! Durable article storage on async SQLite.
//!
//! The store owns durable truth; the engine's in-memory set is a cache
//! reloaded from here after every mutating operation. All writes are
//! single statements — multi-row operations (purge, mark-all) rely on
//! eventual consistency via the reload that follows them.

mod articles;
mod schema;
mod types;

pub use schema::Database;
pub use types::{ArticleRecord, NewArticle, StoreError};

use async_trait::async_trait;

/// Capability set the engine needs from a persistent store.
///
/// `Database` is the production implementation; tests substitute fakes
/// to exercise the engine without SQLite where useful.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert a new article with `read = false`, `deleted = false`.
    /// Returns the store-assigned id.
    async fn insert(&self, article: &NewArticle) -> Result<i64, StoreError>;

    /// Mark an article deleted without removing the row.
    async fn soft_delete(&self, id: i64) -> Result<(), StoreError>;

    /// Set the read flag on a single article.
    async fn set_read(&self, id: i64, read: bool) -> Result<(), StoreError>;

    /// Set the read flag on every article of one feed. Returns rows changed.
    async fn set_read_by_feed(&self, feed: &str, read: bool) -> Result<u64, StoreError>;

    /// Set the read flag on every article. Returns rows changed.
    async fn set_read_all(&self, read: bool) -> Result<u64, StoreError>;

    /// Physically remove soft-deleted articles older than
    /// `deleted_older_than_days` and read articles older than
    /// `read_older_than_days`. Returns rows removed. Idempotent.
    async fn purge(
        &self,
        deleted_older_than_days: u32,
        read_older_than_days: u32,
    ) -> Result<u64, StoreError>;

    /// Load every live (non-deleted) article, in insertion order.
    async fn scan_all(&self) -> Result<Vec<ArticleRecord>, StoreError>;
}
