use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use super::follows::insert_feed_follow;
use super::schema::Database;
use super::types::{now_millis, DatabaseError, Feed, FeedFollow, FeedListing};

const FEED_COLUMNS: &str = "id, created_at, updated_at, name, url, user_id, last_fetched_at";

async fn insert_feed<'e, E: SqliteExecutor<'e>>(
    executor: E,
    name: &str,
    url: &str,
    user_id: Uuid,
) -> Result<Feed, DatabaseError> {
    let now = now_millis();
    sqlx::query_as::<_, Feed>(&format!(
        "INSERT INTO feeds (id, created_at, updated_at, name, url, user_id) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {FEED_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(name)
    .bind(url)
    .bind(user_id)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        if DatabaseError::is_unique_violation(&e) {
            DatabaseError::DuplicateFeed(url.to_string())
        } else {
            DatabaseError::Other(e)
        }
    })
}

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Insert a feed without following it.
    ///
    /// # Errors
    ///
    /// `DatabaseError::DuplicateFeed` when the URL is already registered.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<Feed, DatabaseError> {
        insert_feed(&self.pool, name, url, user_id).await
    }

    /// Insert a feed and the creator's follow in a single transaction.
    ///
    /// Either both rows exist afterwards or neither does.
    pub async fn add_feed(
        &self,
        name: &str,
        url: &str,
        user_id: Uuid,
    ) -> Result<(Feed, FeedFollow), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let feed = insert_feed(&mut *tx, name, url, user_id).await?;
        let follow = insert_feed_follow(&mut *tx, user_id, feed.id).await?;
        tx.commit().await?;

        tracing::debug!(feed = %feed.url, user_id = %user_id, "Feed added");
        Ok((feed, follow))
    }

    /// Every feed with the name of the user who added it.
    pub async fn get_feeds(&self) -> Result<Vec<FeedListing>, DatabaseError> {
        let feeds = sqlx::query_as::<_, FeedListing>(
            r#"
            SELECT f.id, f.created_at, f.updated_at, f.name, f.url, f.user_id,
                   f.last_fetched_at, u.name AS owner_name
            FROM feeds f
            JOIN users u ON u.id = f.user_id
            ORDER BY f.created_at, f.name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Resolve a feed by its exact URL.
    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, DatabaseError> {
        let feed = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Delete every feed. Follows cascade.
    pub async fn delete_all_feeds(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM feeds").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Scheduler Operations
    // ========================================================================

    /// Fairness query: the `limit` feeds most overdue for a fetch.
    ///
    /// Never-fetched feeds come first, then ascending `last_fetched_at`.
    /// Ties fall back to creation order and finally id so the result is
    /// fully deterministic.
    pub async fn get_next_feeds_to_fetch(&self, limit: u32) -> Result<Vec<Feed>, DatabaseError> {
        let feeds = sqlx::query_as::<_, Feed>(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds \
             ORDER BY last_fetched_at ASC NULLS FIRST, created_at ASC, id ASC \
             LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    /// Record a fetch attempt at the current time.
    ///
    /// Applied regardless of whether the fetch succeeded, so a broken feed
    /// rotates to the back of the queue like any other.
    pub async fn mark_feed_fetched(&self, feed_id: Uuid) -> Result<(), DatabaseError> {
        self.mark_feed_fetched_at(feed_id, now_millis()).await
    }

    /// Record a fetch attempt at an explicit epoch-millisecond timestamp.
    pub async fn mark_feed_fetched_at(&self, feed_id: Uuid, at: i64) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE feeds SET last_fetched_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
