use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use crate::storage::ArticleRecord;

// ============================================================================
// Article
// ============================================================================

/// An article as held in the engine's in-memory set.
///
/// Only live (non-deleted) articles are kept in memory. `highlight` is
/// derived at load time and never persisted.
///
/// String fields use `Arc<str>` so projection snapshots clone cheaply.
#[derive(Debug, Clone)]
pub struct Article {
    /// Store-assigned id; 0 means not yet persisted.
    pub id: i64,
    /// The feed's self-reported title — the grouping key, not the URL.
    pub feed: Arc<str>,
    pub title: Arc<str>,
    pub content: Arc<str>,
    pub link: Arc<str>,
    /// Configured human label for the source, may be empty.
    pub display_name: Arc<str>,
    pub published: DateTime<Utc>,
    pub read: bool,
    pub highlight: bool,
}

impl Article {
    /// Build the in-memory form of a stored row, deriving the highlight flag
    /// from the configured keywords (already lower-cased).
    pub fn from_record(record: ArticleRecord, highlights: &[String]) -> Self {
        let highlight = title_is_highlighted(&record.title, highlights);
        Self {
            id: record.id,
            feed: record.feed,
            title: record.title,
            content: record.content,
            link: record.link,
            display_name: record.display_name,
            published: Utc
                .timestamp_opt(record.published, 0)
                .single()
                .unwrap_or_default(),
            read: record.read,
            highlight,
        }
    }
}

/// An article is highlighted iff some whitespace-delimited token of its
/// title, lower-cased, contains some configured keyword as a substring.
/// Keywords must already be lower-cased and non-empty.
pub(crate) fn title_is_highlighted(title: &str, highlights: &[String]) -> bool {
    title.split_whitespace().any(|token| {
        let token = token.to_lowercase();
        highlights.iter().any(|keyword| token.contains(keyword))
    })
}

// ============================================================================
// Buckets
// ============================================================================

/// A named view filter over the article set: one of the three reserved
/// buckets, or a literal feed title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bucket {
    Highlight,
    Unread,
    AllArticles,
    Feed(Arc<str>),
}

impl Bucket {
    /// Resolve a bucket name; anything that is not a reserved name is a
    /// feed title.
    pub fn from_name(name: &str) -> Self {
        match name {
            "highlight" => Bucket::Highlight,
            "unread" => Bucket::Unread,
            "allarticles" => Bucket::AllArticles,
            other => Bucket::Feed(Arc::from(other)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Bucket::Highlight => "highlight",
            Bucket::Unread => "unread",
            Bucket::AllArticles => "allarticles",
            Bucket::Feed(title) => title,
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// Ordering contract for projections. Whatever the last explicit sort
/// command established stays in effect until the next one (a reconcile
/// cycle resets to `Date`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Published time descending, ties keep prior (insertion) order.
    Date,
    /// Feed title ascending.
    Feed,
    /// Article title ascending.
    Title,
    /// Unread before read, stable.
    Unread,
}

/// All sorts are stable so ties preserve the previous arrangement —
/// after a reload that is insertion (id) order.
pub(crate) fn sort_articles(articles: &mut [Article], order: SortOrder) {
    match order {
        SortOrder::Date => articles.sort_by(|a, b| b.published.cmp(&a.published)),
        SortOrder::Feed => articles.sort_by(|a, b| a.feed.cmp(&b.feed)),
        SortOrder::Title => articles.sort_by(|a, b| a.title.cmp(&b.title)),
        SortOrder::Unread => articles.sort_by(|a, b| a.read.cmp(&b.read)),
    }
}
