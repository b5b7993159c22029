use chrono::{DateTime, Utc};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A user with this name already exists (UNIQUE on users.name)
    #[error("User '{0}' already exists")]
    DuplicateUser(String),

    /// A feed with this URL already exists (UNIQUE on feeds.url)
    #[error("A feed with URL '{0}' already exists")]
    DuplicateFeed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check whether a sqlx error is a UNIQUE constraint violation
    pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// Registered user. Timestamps are Unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
}

/// Feed row.
///
/// `user_id` records who first added the feed; it grants no special access.
/// `last_fetched_at` is `None` until the scheduler has visited the feed once.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Feed {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: Uuid,
    pub last_fetched_at: Option<i64>,
}

/// Many-to-many link between a user and a feed
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FeedFollow {
    pub id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: Uuid,
    pub feed_id: Uuid,
}

/// Feed joined with the name of the user who added it (`feeds` listing)
#[derive(Debug, Clone, FromRow)]
pub struct FeedListing {
    #[sqlx(flatten)]
    pub feed: Feed,
    pub owner_name: String,
}

/// Follow joined with feed and user names (`follow` / `following` output)
#[derive(Debug, Clone, FromRow)]
pub struct FeedFollowView {
    pub id: Uuid,
    pub created_at: i64,
    pub user_id: Uuid,
    pub feed_id: Uuid,
    pub feed_name: String,
    pub feed_url: String,
    pub user_name: String,
}

/// Current wall-clock time in epoch milliseconds, the unit of every timestamp column.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render an epoch-millisecond timestamp for terminal output.
pub fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
