use uuid::Uuid;

use super::schema::Database;
use super::types::{now_millis, DatabaseError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user with a fresh v4 id.
    ///
    /// # Errors
    ///
    /// `DatabaseError::DuplicateUser` when the name is taken (exact,
    /// case-sensitive match).
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = now_millis();
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, created_at, updated_at, name)
            VALUES (?, ?, ?, ?)
            RETURNING id, created_at, updated_at, name
        "#,
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if DatabaseError::is_unique_violation(&e) {
                DatabaseError::DuplicateUser(name.to_string())
            } else {
                DatabaseError::Other(e)
            }
        })
    }

    /// Look up a user by exact name.
    pub async fn get_user(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// All users in registration order.
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, name FROM users ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user. Follows cascade.
    pub async fn delete_all_users(&self) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Wipe all data: feeds first, then users.
    ///
    /// Two independent statements; a failure in the second leaves the feeds
    /// already deleted.
    pub async fn reset(&self) -> Result<(), DatabaseError> {
        let feeds = self.delete_all_feeds().await?;
        let users = self.delete_all_users().await?;
        tracing::info!(feeds, users, "Database reset");
        Ok(())
    }
}
