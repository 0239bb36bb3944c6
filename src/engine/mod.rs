//! The aggregation engine: reconciles fetched feed items against persisted
//! history, derives per-article view state, and answers bucket projections.
//!
//! The engine exclusively owns the in-memory article set and view state;
//! the store owns durable truth. The in-memory set is a cache reloaded from
//! the store after every mutating operation — read-after-write is never
//! assumed through any other path.
//!
//! Concurrency contract: the state lock guards only in-memory access and is
//! never held across a network fetch or a store call. A projection observes
//! either a fully-applied reload or the fully-prior set, never a mix.

mod commands;
mod model;
mod reconcile;
mod scheduler;
mod view;

pub use model::{Article, Bucket, SortOrder};
pub use reconcile::RefreshSummary;
pub use scheduler::{run_scheduler, EngineEvent, SchedulerConfig};
pub use view::{ArticleView, FeedSummary};

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::config::{Config, FeedSource};
use crate::feed::FeedTransport;
use crate::storage::{ArticleStore, StoreError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    /// No prior read transition exists — a no-op signal, not a failure.
    #[error("no read transition to undo")]
    NothingToUndo,

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Options
// ============================================================================

/// Engine tuning taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Highlight keywords, matched case-insensitively against title tokens.
    pub highlights: Vec<String>,
    /// Fetched items older than this never reach storage.
    pub skip_articles_older_than_days: i64,
    /// Retention window for soft-deleted articles.
    pub days_to_keep_deleted_articles: u32,
    /// Retention window for read articles.
    pub days_to_keep_read_articles: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            highlights: Vec::new(),
            skip_articles_older_than_days: 10,
            days_to_keep_deleted_articles: 30,
            days_to_keep_read_articles: 30,
        }
    }
}

impl From<&Config> for EngineOptions {
    fn from(config: &Config) -> Self {
        Self {
            highlights: config.highlights.clone(),
            skip_articles_older_than_days: config.skip_articles_older_than_days,
            days_to_keep_deleted_articles: config.days_to_keep_deleted_articles,
            days_to_keep_read_articles: config.days_to_keep_read_articles,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// View state owned by the engine, never persisted.
pub(crate) struct ViewState {
    /// The authoritative in-memory article set (live articles only).
    pub(crate) articles: Vec<Article>,
    /// Currently selected bucket.
    pub(crate) active_feed: Bucket,
    /// Links marked for batch-open; ephemeral, cleared on consumption.
    pub(crate) links_to_open: Vec<String>,
    /// Last two articles whose read state was driven by a command,
    /// supporting exactly one level of undo.
    pub(crate) prev_article: Option<i64>,
    pub(crate) undo_article: Option<i64>,
    /// Timestamp of the last successful reconcile cycle.
    pub(crate) last_update: Option<DateTime<Utc>>,
    /// Set by a reconcile cycle, consumed by the next projection; keeps the
    /// just-read article visible in the unread bucket for one cycle.
    pub(crate) is_updated: bool,
    /// Ordering established by the last sort command.
    pub(crate) sort: SortOrder,
}

/// The aggregation engine. Store and transport are injected so tests can
/// substitute fakes; production wires in SQLite and HTTP.
pub struct Engine<S, T> {
    pub(crate) store: S,
    pub(crate) transport: T,
    pub(crate) sources: Vec<FeedSource>,
    pub(crate) options: EngineOptions,
    pub(crate) state: Mutex<ViewState>,
}

impl<S: ArticleStore, T: FeedTransport> Engine<S, T> {
    pub fn new(store: S, transport: T, sources: Vec<FeedSource>, mut options: EngineOptions) -> Self {
        // Config normalizes keywords on load; re-normalize here so directly
        // constructed options behave identically.
        options.highlights = options
            .highlights
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();

        Self {
            store,
            transport,
            sources,
            options,
            state: Mutex::new(ViewState {
                articles: Vec::new(),
                active_feed: Bucket::Highlight,
                links_to_open: Vec::new(),
                prev_article: None,
                undo_article: None,
                last_update: None,
                is_updated: false,
                sort: SortOrder::Date,
            }),
        }
    }

    /// Lock the view state. A poisoned lock only means a panicking thread
    /// held it; the state itself stays structurally valid, so recover.
    pub(crate) fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The currently selected bucket.
    pub fn active_feed(&self) -> Bucket {
        self.state().active_feed.clone()
    }

    /// Timestamp of the last successful reconcile cycle.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state().last_update
    }
}

// ============================================================================
// Test Support
// ============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::feed::{FetchError, FetchedFeed, FetchedItem, SourceFetch};
    use crate::storage::{ArticleRecord, NewArticle};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    /// In-memory store fake mirroring the SQLite implementation's contract,
    /// including the live (feed, title) uniqueness rejection.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        rows: Mutex<Vec<ArticleRecord>>,
        next_id: AtomicI64,
    }

    impl FakeStore {
        pub(crate) fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(1),
            }
        }

        pub(crate) fn row(&self, id: i64) -> Option<ArticleRecord> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == id)
                .cloned()
        }
    }

    #[async_trait]
    impl ArticleStore for FakeStore {
        async fn insert(&self, article: &NewArticle) -> Result<i64, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if rows
                .iter()
                .any(|r| !r.deleted && &*r.feed == article.feed && &*r.title == article.title)
            {
                return Err(StoreError::Other(sqlx::Error::Protocol(format!(
                    "UNIQUE constraint failed: articles.feed, articles.title ({}, {})",
                    article.feed, article.title
                ))));
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            rows.push(ArticleRecord {
                id,
                feed: Arc::from(article.feed.as_str()),
                title: Arc::from(article.title.as_str()),
                content: Arc::from(article.content.as_str()),
                link: Arc::from(article.link.as_str()),
                read: false,
                display_name: Arc::from(article.display_name.as_str()),
                deleted: false,
                published: article.published,
            });
            Ok(id)
        }

        async fn soft_delete(&self, id: i64) -> Result<(), StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.deleted = true;
            }
            Ok(())
        }

        async fn set_read(&self, id: i64, read: bool) -> Result<(), StoreError> {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
                row.read = read;
            }
            Ok(())
        }

        async fn set_read_by_feed(&self, feed: &str, read: bool) -> Result<u64, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let mut changed = 0;
            for row in rows.iter_mut().filter(|r| &*r.feed == feed) {
                row.read = read;
                changed += 1;
            }
            Ok(changed)
        }

        async fn set_read_all(&self, read: bool) -> Result<u64, StoreError> {
            let mut rows = self.rows.lock().unwrap();
            let changed = rows.len() as u64;
            for row in rows.iter_mut() {
                row.read = read;
            }
            Ok(changed)
        }

        async fn purge(
            &self,
            deleted_older_than_days: u32,
            read_older_than_days: u32,
        ) -> Result<u64, StoreError> {
            let now = Utc::now().timestamp();
            let deleted_cutoff = now - i64::from(deleted_older_than_days) * 86_400;
            let read_cutoff = now - i64::from(read_older_than_days) * 86_400;
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| {
                !((r.deleted && r.published < deleted_cutoff)
                    || (r.read && r.published < read_cutoff))
            });
            Ok((before - rows.len()) as u64)
        }

        async fn scan_all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().filter(|r| !r.deleted).cloned().collect())
        }
    }

    /// Transport fake serving canned responses by source URL.
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        responses: Mutex<HashMap<String, Result<FetchedFeed, String>>>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn serve(&self, url: &str, feed: FetchedFeed) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Ok(feed));
        }

        pub(crate) fn fail(&self, url: &str, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(url.to_string(), Err(message.to_string()));
        }
    }

    #[async_trait]
    impl FeedTransport for FakeTransport {
        async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<SourceFetch> {
            let responses = self.responses.lock().unwrap();
            sources
                .iter()
                .map(|source| SourceFetch {
                    source: source.clone(),
                    result: match responses.get(&source.url) {
                        Some(Ok(feed)) => Ok(feed.clone()),
                        Some(Err(message)) => Err(FetchError::Parse(message.clone())),
                        None => Err(FetchError::Parse("no canned response".to_string())),
                    },
                })
                .collect()
        }
    }

    pub(crate) fn item(title: &str, published: Option<DateTime<Utc>>) -> FetchedItem {
        FetchedItem {
            title: title.to_string(),
            link: format!("https://example.com/{}", title),
            description: Some(format!("About {}", title)),
            body: None,
            published,
            updated: None,
        }
    }

    pub(crate) fn feed(title: &str, items: Vec<FetchedItem>) -> FetchedFeed {
        FetchedFeed {
            title: title.to_string(),
            items,
        }
    }

    pub(crate) fn source(url: &str) -> FeedSource {
        FeedSource {
            url: url.to_string(),
            display_name: None,
        }
    }
}
