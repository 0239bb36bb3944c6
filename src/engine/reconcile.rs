use chrono::Utc;
use std::collections::HashSet;

use super::model::{sort_articles, Article, SortOrder};
use super::{Engine, EngineError};
use crate::feed::FeedTransport;
use crate::storage::{ArticleStore, NewArticle};

/// Outcome of one reconciliation cycle.
#[derive(Debug, Clone, Copy)]
pub struct RefreshSummary {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub inserted: usize,
    pub total: usize,
}

impl<S: ArticleStore, T: FeedTransport> Engine<S, T> {
    /// One full reconciliation cycle: fetch → dedup → persist → reload.
    ///
    /// Fetches fan out across all configured sources concurrently; a failed
    /// source is logged and its items are simply absent this cycle. New items
    /// get the published → updated → fetch-time fallback, are dropped when
    /// older than the configured threshold, and are deduplicated on
    /// `(feed title, title)` against the currently loaded in-memory set.
    /// A failed row insert is logged and skipped — the next cycle re-checks
    /// against the reloaded set, so a recovered store never accumulates
    /// duplicates.
    ///
    /// Safe to invoke concurrently with foreground mutations: the state lock
    /// is taken only for the dedup snapshot and the final set swap, never
    /// across the network fetch or a store call.
    pub async fn refresh(&self) -> Result<RefreshSummary, EngineError> {
        let outcomes = self.transport.fetch_all(&self.sources).await;
        let now = Utc::now();

        // Dedup keys of the currently loaded set. Kept as a local snapshot,
        // extended as this cycle inserts, so one batch containing the same
        // item twice still produces a single row.
        let mut seen: HashSet<(String, String)> = {
            let state = self.state();
            state
                .articles
                .iter()
                .map(|a| (a.feed.to_string(), a.title.to_string()))
                .collect()
        };

        let mut sources_ok = 0;
        let mut sources_failed = 0;
        let mut inserted = 0;

        for outcome in outcomes {
            let fetched = match outcome.result {
                Ok(fetched) => {
                    sources_ok += 1;
                    fetched
                }
                Err(e) => {
                    sources_failed += 1;
                    tracing::warn!(
                        source = %outcome.source.url,
                        error = %e,
                        "Feed fetch failed, its items are skipped this cycle"
                    );
                    continue;
                }
            };

            // Group by the title the feed reports about itself; a feed that
            // reports none falls back to the configured URL.
            let feed_title = if fetched.title.trim().is_empty() {
                outcome.source.url.clone()
            } else {
                fetched.title.clone()
            };
            let display_name = outcome.source.display_name.clone().unwrap_or_default();

            for item in fetched.items {
                let published = item.published.or(item.updated).unwrap_or(now);

                if (now - published).num_days() > self.options.skip_articles_older_than_days {
                    continue;
                }

                let key = (feed_title.clone(), item.title.clone());
                if seen.contains(&key) {
                    continue;
                }

                let content = item
                    .description
                    .filter(|d| !d.is_empty())
                    .or(item.body)
                    .unwrap_or_default();

                let article = NewArticle {
                    feed: feed_title.clone(),
                    title: item.title,
                    content,
                    link: item.link,
                    display_name: display_name.clone(),
                    published: published.timestamp(),
                };

                match self.store.insert(&article).await {
                    Ok(_) => {
                        inserted += 1;
                        seen.insert(key);
                    }
                    Err(e) => {
                        tracing::warn!(
                            feed = %article.feed,
                            title = %article.title,
                            error = %e,
                            "Failed to persist article, will retry next cycle"
                        );
                    }
                }
            }
        }

        self.reload().await?;

        let total = {
            let mut state = self.state();
            state.last_update = Some(now);
            state.is_updated = true;
            // A reconcile cycle always re-establishes date order
            state.sort = SortOrder::Date;
            sort_articles(&mut state.articles, SortOrder::Date);
            state.articles.len()
        };

        tracing::info!(
            sources_ok,
            sources_failed,
            inserted,
            total,
            "Reconciliation cycle complete"
        );

        Ok(RefreshSummary {
            sources_ok,
            sources_failed,
            inserted,
            total,
        })
    }

    /// Replace the in-memory set with a fresh scan of the store,
    /// re-deriving highlight flags and preserving the current sort order.
    pub async fn reload(&self) -> Result<(), EngineError> {
        let records = self.store.scan_all().await?;
        let articles: Vec<Article> = records
            .into_iter()
            .map(|record| Article::from_record(record, &self.options.highlights))
            .collect();

        let mut state = self.state();
        let sort = state.sort;
        state.articles = articles;
        sort_articles(&mut state.articles, sort);
        Ok(())
    }

    /// Retention purge: physically remove soft-deleted and read articles
    /// older than their configured windows. Idempotent; runs after the
    /// scheduled cycle's reload, never blocking it.
    pub async fn purge(&self) -> Result<u64, EngineError> {
        let removed = self
            .store
            .purge(
                self.options.days_to_keep_deleted_articles,
                self.options.days_to_keep_read_articles,
            )
            .await?;
        if removed > 0 {
            tracing::info!(removed, "Purged articles past their retention window");
        }
        Ok(removed)
    }
}
