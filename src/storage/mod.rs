//! Relational store for users, feeds and follows (SQLite via `sqlx`).
//!
//! Every query lives on [`Database`]; callers only ever hold copies of rows.

mod feeds;
mod follows;
mod schema;
mod types;
mod users;

pub use schema::Database;
pub use types::{
    format_timestamp, now_millis, DatabaseError, Feed, FeedFollow, FeedFollowView, FeedListing,
    User,
};
