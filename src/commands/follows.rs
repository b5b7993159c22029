//! `follow`, `unfollow` and `following`.
//!
//! Feeds are addressed by URL on the command line and by id in the store,
//! so two feeds sharing a display name never get confused.
use std::io::Write;

use super::{Command, CommandError, State};
use crate::storage::{Feed, User};

async fn feed_for_url(state: &State, url: &str) -> Result<Feed, CommandError> {
    state
        .db
        .get_feed_by_url(url)
        .await?
        .ok_or_else(|| CommandError::FeedNotFound(url.to_string()))
}

pub(super) async fn follow(state: &mut State, cmd: &Command, user: User) -> Result<(), CommandError> {
    let url = cmd.arg(0, "url")?;
    let feed = feed_for_url(state, url).await?;

    if state.db.get_feed_follow(user.id, feed.id).await?.is_some() {
        return Err(CommandError::AlreadyFollowing(feed.name));
    }

    let follow = state.db.create_feed_follow(user.id, feed.id).await?;
    writeln!(state.out, "{} is now following {}", follow.user_name, follow.feed_name)?;
    Ok(())
}

pub(super) async fn unfollow(
    state: &mut State,
    cmd: &Command,
    user: User,
) -> Result<(), CommandError> {
    let url = cmd.arg(0, "url")?;
    let feed = feed_for_url(state, url).await?;

    if state.db.get_feed_follow(user.id, feed.id).await?.is_none() {
        return Err(CommandError::NotFollowing(feed.name));
    }

    state.db.delete_feed_follow(user.id, feed.id).await?;
    tracing::debug!(user = %user.name, feed = %feed.url, "Unfollowed");
    writeln!(state.out, "{} unfollowed {}", user.name, feed.name)?;
    Ok(())
}

pub(super) async fn following(
    state: &mut State,
    _cmd: &Command,
    user: User,
) -> Result<(), CommandError> {
    let follows = state.db.get_feed_follows_for_user(user.id).await?;
    for follow in &follows {
        writeln!(state.out, "* {}", follow.feed_name)?;
    }
    Ok(())
}
