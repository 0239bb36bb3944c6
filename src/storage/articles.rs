use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::schema::Database;
use super::types::{ArticleDbRow, ArticleRecord, NewArticle, StoreError};
use super::ArticleStore;

#[async_trait]
impl ArticleStore for Database {
    /// Insert a new article row.
    ///
    /// The partial unique index on `(feed, title) WHERE deleted = 0` rejects
    /// a duplicate live article at the store level; the engine treats that
    /// like any other write failure (logged, skipped, self-healing on the
    /// next cycle once the in-memory set reflects the existing row).
    async fn insert(&self, article: &NewArticle) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (feed, title, content, link, read, display_name, deleted, published)
            VALUES (?, ?, ?, ?, 0, ?, 0, ?)
        "#,
        )
        .bind(&article.feed)
        .bind(&article.title)
        .bind(&article.content)
        .bind(&article.link)
        .bind(&article.display_name)
        .bind(article.published)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Soft delete: the row stays until the retention purge removes it.
    async fn soft_delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET deleted = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_read(&self, id: i64, read: bool) -> Result<(), StoreError> {
        sqlx::query("UPDATE articles SET read = ? WHERE id = ?")
            .bind(read)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_read_by_feed(&self, feed: &str, read: bool) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE articles SET read = ? WHERE feed = ?")
            .bind(read)
            .bind(feed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_read_all(&self, read: bool) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE articles SET read = ?")
            .bind(read)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Two independent single-statement deletes; each is atomic on its own,
    /// cross-statement atomicity is not required (eventual consistency after
    /// the next reload is sufficient).
    async fn purge(
        &self,
        deleted_older_than_days: u32,
        read_older_than_days: u32,
    ) -> Result<u64, StoreError> {
        let now = Utc::now();
        let deleted_cutoff = (now - Duration::days(i64::from(deleted_older_than_days))).timestamp();
        let read_cutoff = (now - Duration::days(i64::from(read_older_than_days))).timestamp();

        let deleted = sqlx::query("DELETE FROM articles WHERE deleted = 1 AND published < ?")
            .bind(deleted_cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        let read = sqlx::query("DELETE FROM articles WHERE read = 1 AND published < ?")
            .bind(read_cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted + read)
    }

    /// Full scan of live rows in insertion (id) order — the tie-break order
    /// the default published-descending sort preserves.
    async fn scan_all(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let rows = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, feed, title, content, link, read, display_name, deleted, published
            FROM articles
            WHERE deleted = 0
            ORDER BY id
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ArticleDbRow::into_record).collect())
    }
}

impl Database {
    /// Fetch one row by id regardless of deletion state.
    ///
    /// Not part of [`ArticleStore`] — the engine never needs it, but tests
    /// verify soft-delete recoverability through direct store inspection.
    pub async fn inspect(&self, id: i64) -> Result<Option<ArticleRecord>, StoreError> {
        let row = sqlx::query_as::<_, ArticleDbRow>(
            r#"
            SELECT id, feed, title, content, link, read, display_name, deleted, published
            FROM articles
            WHERE id = ?
        "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ArticleDbRow::into_record))
    }
}
