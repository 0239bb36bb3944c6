use std::collections::BTreeMap;

use super::model::{sort_articles, Article, Bucket, SortOrder};
use super::Engine;
use crate::feed::FeedTransport;
use crate::storage::ArticleStore;

/// One projected article plus its display annotations.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub article: Article,
    /// Whether the article's link is currently marked for batch-open.
    /// Read-only annotation for display markup, never a mutation.
    pub marked: bool,
}

/// One row of the feed list: a reserved pseudo-bucket or a feed title,
/// with its unread/total counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSummary {
    pub name: String,
    pub bucket: Bucket,
    pub unread: usize,
    pub total: usize,
}

impl<S: ArticleStore, T: FeedTransport> Engine<S, T> {
    /// Project the in-memory set through a bucket filter.
    ///
    /// Runs entirely under the state lock, so it observes either a fully
    /// prior or fully reloaded set, never a partial mix with a concurrent
    /// reconcile cycle.
    ///
    /// The unread bucket has one carve-out: right after a reconcile cycle
    /// (`is_updated` set), the most recently read article stays visible even
    /// though it is read, so the list does not shift under the cursor. The
    /// flag is consumed by this projection.
    pub fn articles(&self, bucket: &Bucket) -> Vec<ArticleView> {
        let mut state = self.state();
        let prev = state.prev_article;
        let is_updated = state.is_updated;

        let mut views = Vec::new();
        for article in &state.articles {
            let keep = match bucket {
                Bucket::Highlight => article.highlight,
                Bucket::AllArticles => true,
                Bucket::Unread => {
                    if let (Some(prev_id), true) = (prev, is_updated) {
                        article.id == prev_id || !article.read
                    } else {
                        !article.read
                    }
                }
                Bucket::Feed(title) => article.feed == *title,
            };
            if keep {
                let marked = state
                    .links_to_open
                    .iter()
                    .any(|link| link.as_str() == &*article.link);
                views.push(ArticleView {
                    article: article.clone(),
                    marked,
                });
            }
        }

        state.is_updated = false;
        views
    }

    /// Select a bucket: re-establish date order and project it.
    pub fn select_feed(&self, bucket: Bucket) -> Vec<ArticleView> {
        {
            let mut state = self.state();
            state.sort = SortOrder::Date;
            sort_articles(&mut state.articles, SortOrder::Date);
            state.active_feed = bucket.clone();
        }
        self.articles(&bucket)
    }

    /// Re-order the in-memory set. The order stays in effect for every
    /// projection until the next sort command or reconcile cycle.
    pub fn sort(&self, order: SortOrder) {
        let mut state = self.state();
        state.sort = order;
        sort_articles(&mut state.articles, order);
    }

    /// Feed list with unread/total counts: the three reserved pseudo-buckets
    /// first, then feed titles ascending.
    pub fn feeds(&self) -> Vec<FeedSummary> {
        let mut state = self.state();

        let mut highlight_unread = 0;
        let mut highlight_total = 0;
        let mut unread_total = 0;
        let mut per_feed: BTreeMap<&str, (usize, usize)> = BTreeMap::new();

        for article in &state.articles {
            if article.highlight {
                highlight_total += 1;
                if !article.read {
                    highlight_unread += 1;
                }
            }
            let counts = per_feed.entry(&article.feed).or_insert((0, 0));
            counts.1 += 1;
            if !article.read {
                counts.0 += 1;
                unread_total += 1;
            }
        }

        let total = state.articles.len();

        let mut summaries = vec![
            FeedSummary {
                name: "Highlight".to_string(),
                bucket: Bucket::Highlight,
                unread: highlight_unread,
                total: highlight_total,
            },
            FeedSummary {
                name: "Unread".to_string(),
                bucket: Bucket::Unread,
                unread: unread_total,
                total: unread_total,
            },
            FeedSummary {
                name: "All Articles".to_string(),
                bucket: Bucket::AllArticles,
                unread: unread_total,
                total,
            },
        ];

        for (feed, (unread, feed_total)) in &per_feed {
            summaries.push(FeedSummary {
                name: feed.to_string(),
                bucket: Bucket::Feed((*feed).into()),
                unread: *unread,
                total: *feed_total,
            });
        }

        // With nothing left unread there is no cursor to protect; drop the
        // remembered article so it is not resurrected by the next projection.
        if unread_total == 0 {
            state.prev_article = None;
        }

        summaries
    }
}
