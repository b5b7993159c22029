use sqlx::sqlite::SqliteExecutor;
use uuid::Uuid;

use super::schema::Database;
use super::types::{now_millis, DatabaseError, FeedFollow, FeedFollowView};

const FOLLOW_VIEW_SELECT: &str = r#"
    SELECT ff.id, ff.created_at, ff.user_id, ff.feed_id,
           f.name AS feed_name, f.url AS feed_url, u.name AS user_name
    FROM feed_follows ff
    JOIN feeds f ON f.id = ff.feed_id
    JOIN users u ON u.id = ff.user_id
"#;

pub(super) async fn insert_feed_follow<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    feed_id: Uuid,
) -> Result<FeedFollow, DatabaseError> {
    let now = now_millis();
    let follow = sqlx::query_as::<_, FeedFollow>(
        r#"
        INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, created_at, updated_at, user_id, feed_id
    "#,
    )
    .bind(Uuid::new_v4())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .bind(feed_id)
    .fetch_one(executor)
    .await?;
    Ok(follow)
}

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Create a follow and return it joined with the feed and user names.
    ///
    /// Does not check for an existing relation; callers must do that first.
    pub async fn create_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<FeedFollowView, DatabaseError> {
        let follow = insert_feed_follow(&self.pool, user_id, feed_id).await?;
        let view = sqlx::query_as::<_, FeedFollowView>(&format!(
            "{FOLLOW_VIEW_SELECT} WHERE ff.id = ?"
        ))
        .bind(follow.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(view)
    }

    /// The user's follows, oldest first.
    pub async fn get_feed_follows_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FeedFollowView>, DatabaseError> {
        let follows = sqlx::query_as::<_, FeedFollowView>(&format!(
            "{FOLLOW_VIEW_SELECT} WHERE ff.user_id = ? ORDER BY ff.created_at, f.name"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Existing follow for the (user, feed) pair, matched by feed id.
    pub async fn get_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<Option<FeedFollow>, DatabaseError> {
        let follow = sqlx::query_as::<_, FeedFollow>(
            r#"
            SELECT id, created_at, updated_at, user_id, feed_id
            FROM feed_follows
            WHERE user_id = ? AND feed_id = ?
            LIMIT 1
        "#,
        )
        .bind(user_id)
        .bind(feed_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(follow)
    }

    /// Remove the (user, feed) follow. Returns the number of rows deleted.
    pub async fn delete_feed_follow(
        &self,
        user_id: Uuid,
        feed_id: Uuid,
    ) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM feed_follows WHERE user_id = ? AND feed_id = ?")
            .bind(user_id)
            .bind(feed_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, Feed, User};

    async fn setup() -> (Database, User, Feed) {
        let db = Database::open(":memory:").await.unwrap();
        let owner = db.create_user("owner").await.unwrap();
        let feed = db
            .create_feed("Blog", "https://example.com/feed.xml", owner.id)
            .await
            .unwrap();
        (db, owner, feed)
    }

    #[tokio::test]
    async fn test_create_feed_follow_returns_names() {
        let (db, _, feed) = setup().await;
        let bob = db.create_user("bob").await.unwrap();

        let view = db.create_feed_follow(bob.id, feed.id).await.unwrap();
        assert_eq!(view.feed_name, "Blog");
        assert_eq!(view.user_name, "bob");
        assert_eq!(view.feed_url, "https://example.com/feed.xml");
    }

    #[tokio::test]
    async fn test_get_feed_follow_by_id() {
        let (db, owner, feed) = setup().await;
        assert!(db.get_feed_follow(owner.id, feed.id).await.unwrap().is_none());

        db.create_feed_follow(owner.id, feed.id).await.unwrap();
        let follow = db.get_feed_follow(owner.id, feed.id).await.unwrap().unwrap();
        assert_eq!(follow.feed_id, feed.id);
    }

    #[tokio::test]
    async fn test_same_name_feeds_are_distinct() {
        let (db, owner, feed) = setup().await;
        let twin = db
            .create_feed("Blog", "https://other.example.com/feed.xml", owner.id)
            .await
            .unwrap();
        db.create_feed_follow(owner.id, feed.id).await.unwrap();

        assert!(db.get_feed_follow(owner.id, twin.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_feed_follow() {
        let (db, owner, feed) = setup().await;
        db.create_feed_follow(owner.id, feed.id).await.unwrap();

        assert_eq!(db.delete_feed_follow(owner.id, feed.id).await.unwrap(), 1);
        assert_eq!(db.delete_feed_follow(owner.id, feed.id).await.unwrap(), 0);
        assert!(db.get_feed_follows_for_user(owner.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follows_are_per_user() {
        let (db, owner, feed) = setup().await;
        let bob = db.create_user("bob").await.unwrap();
        db.create_feed_follow(bob.id, feed.id).await.unwrap();

        assert!(db.get_feed_follows_for_user(owner.id).await.unwrap().is_empty());
        assert_eq!(db.get_feed_follows_for_user(bob.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleting_feeds_cascades_follows() {
        let (db, owner, feed) = setup().await;
        db.create_feed_follow(owner.id, feed.id).await.unwrap();

        db.delete_all_feeds().await.unwrap();
        assert!(db.get_feed_follows_for_user(owner.id).await.unwrap().is_empty());
    }
}
