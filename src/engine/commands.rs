use super::{Engine, EngineError};
use crate::feed::FeedTransport;
use crate::storage::ArticleStore;

impl<S: ArticleStore, T: FeedTransport> Engine<S, T> {
    /// Mark one article read. Durable first, then the in-memory reload, so a
    /// projection immediately after observes the new state.
    pub async fn mark_read(&self, id: i64) -> Result<(), EngineError> {
        self.set_read_tracked(id, true).await
    }

    /// Mark one article unread.
    pub async fn mark_unread(&self, id: i64) -> Result<(), EngineError> {
        self.set_read_tracked(id, false).await
    }

    async fn set_read_tracked(&self, id: i64, read: bool) -> Result<(), EngineError> {
        self.store.set_read(id, read).await?;
        {
            let mut state = self.state();
            state.undo_article = state.prev_article;
            state.prev_article = Some(id);
        }
        self.reload().await
    }

    /// Mark every article read, optionally scoped to one feed.
    /// Returns the number of rows changed.
    pub async fn mark_all_read(&self, feed: Option<&str>) -> Result<u64, EngineError> {
        let changed = match feed {
            Some(feed) => self.store.set_read_by_feed(feed, true).await?,
            None => self.store.set_read_all(true).await?,
        };
        self.reload().await?;
        Ok(changed)
    }

    /// Mark every article unread, optionally scoped to one feed.
    pub async fn mark_all_unread(&self, feed: Option<&str>) -> Result<u64, EngineError> {
        let changed = match feed {
            Some(feed) => self.store.set_read_by_feed(feed, false).await?,
            None => self.store.set_read_all(false).await?,
        };
        self.reload().await?;
        Ok(changed)
    }

    /// Soft-delete an article. The row stays in the store until the
    /// retention purge; the in-memory set drops it immediately so the view
    /// updates without waiting for a reload, and any link mark is removed.
    pub async fn delete(&self, id: i64) -> Result<(), EngineError> {
        self.store.soft_delete(id).await?;

        let mut state = self.state();
        if let Some(pos) = state.articles.iter().position(|a| a.id == id) {
            let link = state.articles[pos].link.clone();
            state.articles.remove(pos);
            state.links_to_open.retain(|l| l.as_str() != &*link);
        }
        Ok(())
    }

    /// Revert the most recent selection-driven read transition.
    ///
    /// Both remembered articles go back to unread durably, then the undo
    /// slot shifts down: `prev := undo, undo := none`. At most the two most
    /// recent transitions are recoverable; anything older is gone.
    ///
    /// # Errors
    ///
    /// `EngineError::NothingToUndo` when no prior transition exists — a
    /// no-op signal, not a failure.
    pub async fn undo_last_read(&self) -> Result<(), EngineError> {
        let (prev, undo) = {
            let state = self.state();
            (state.prev_article, state.undo_article)
        };

        let Some(prev) = prev else {
            return Err(EngineError::NothingToUndo);
        };

        self.store.set_read(prev, false).await?;
        if let Some(undo) = undo {
            self.store.set_read(undo, false).await?;
        }

        {
            let mut state = self.state();
            state.prev_article = state.undo_article.take();
        }
        self.reload().await
    }

    /// Toggle an article's link in the batch-open set. Ephemeral only —
    /// durable state is untouched. Returns whether the link is now marked;
    /// an id not in the in-memory set is a no-op.
    pub fn toggle_link_mark(&self, id: i64) -> bool {
        let mut state = self.state();
        let Some(link) = state
            .articles
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.link.clone())
        else {
            tracing::debug!(id, "Link mark toggle for unknown article ignored");
            return false;
        };

        if let Some(pos) = state
            .links_to_open
            .iter()
            .position(|l| l.as_str() == &*link)
        {
            state.links_to_open.remove(pos);
            false
        } else {
            state.links_to_open.push(link.to_string());
            true
        }
    }

    /// Take the batch-open set, clearing it. The caller (presentation layer)
    /// performs the actual opening.
    pub fn drain_marked_links(&self) -> Vec<String> {
        std::mem::take(&mut self.state().links_to_open)
    }
}
