//! `addfeed` and `feeds`.
use std::io::Write;

use super::{Command, CommandError, State};
use crate::storage::{format_timestamp, User};
use crate::util::validate_url;

/// `addfeed <name> <url>`: store the feed and follow it, atomically.
pub(super) async fn add_feed(
    state: &mut State,
    cmd: &Command,
    user: User,
) -> Result<(), CommandError> {
    let name = cmd.arg(0, "name")?;
    let url = cmd.arg(1, "url")?;
    validate_url(url)?;

    let (feed, _follow) = state.db.add_feed(name, url, user.id).await?;

    tracing::info!(feed = %feed.name, url = %feed.url, user = %user.name, "Feed added");
    writeln!(state.out, "Feed added: {}", feed.name)?;
    writeln!(state.out, "  url:      {}", feed.url)?;
    writeln!(state.out, "  id:       {}", feed.id)?;
    writeln!(state.out, "  followed: {}", user.name)?;
    Ok(())
}

/// `feeds`: every feed with the user who added it.
pub(super) async fn list_feeds(state: &mut State, _cmd: &Command) -> Result<(), CommandError> {
    let listings = state.db.get_feeds().await?;
    for listing in &listings {
        let feed = &listing.feed;
        let fetched = feed
            .last_fetched_at
            .map(format_timestamp)
            .unwrap_or_else(|| "never".to_string());
        writeln!(state.out, "* {}", feed.name)?;
        writeln!(state.out, "  url:     {}", feed.url)?;
        writeln!(state.out, "  added:   {}", listing.owner_name)?;
        writeln!(state.out, "  fetched: {}", fetched)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{cmd, test_state};
    use super::super::Commands;
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_addfeed_requires_login() {
        let (mut state, _, _dir) = test_state().await;
        let err = Commands::with_defaults()
            .run(
                &mut state,
                &cmd("addfeed", &["blog", "https://example.com/feed.xml"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::UserNotFound(None)));
        assert!(state.db.get_feeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addfeed_creates_feed_and_follow() {
        let (mut state, out, _dir) = test_state().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut state, &cmd("register", &["alice"]))
            .await
            .unwrap();
        out.clear();

        commands
            .run(
                &mut state,
                &cmd("addfeed", &["blog", "https://example.com/feed.xml"]),
            )
            .await
            .unwrap();

        let alice = state.db.get_user("alice").await.unwrap().unwrap();
        let follows = state.db.get_feed_follows_for_user(alice.id).await.unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_name, "blog");
        assert_eq!(follows[0].feed_url, "https://example.com/feed.xml");
        assert!(out.contents().starts_with("Feed added: blog\n"));
    }

    #[tokio::test]
    async fn test_addfeed_duplicate_url() {
        let (mut state, _, _dir) = test_state().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut state, &cmd("register", &["alice"]))
            .await
            .unwrap();
        let add = cmd("addfeed", &["blog", "https://example.com/feed.xml"]);
        commands.run(&mut state, &add).await.unwrap();

        let err = commands.run(&mut state, &add).await.unwrap_err();
        assert!(matches!(err, CommandError::DuplicateFeed(_)));
        assert_eq!(state.db.get_feeds().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_addfeed_rejects_bad_url() {
        let (mut state, _, _dir) = test_state().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut state, &cmd("register", &["alice"]))
            .await
            .unwrap();

        for url in ["not a url", "ftp://example.com/feed", "file:///etc/passwd"] {
            let err = commands
                .run(&mut state, &cmd("addfeed", &["x", url]))
                .await
                .unwrap_err();
            assert!(matches!(err, CommandError::InvalidUrl(_)), "{url}");
        }
        assert!(state.db.get_feeds().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_addfeed_missing_url() {
        let (mut state, _, _dir) = test_state().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut state, &cmd("register", &["alice"]))
            .await
            .unwrap();

        let err = commands
            .run(&mut state, &cmd("addfeed", &["blog"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { what: "url", .. }));
    }

    #[tokio::test]
    async fn test_feeds_lists_owner() {
        let (mut state, out, _dir) = test_state().await;
        let commands = Commands::with_defaults();
        commands
            .run(&mut state, &cmd("register", &["alice"]))
            .await
            .unwrap();
        commands
            .run(
                &mut state,
                &cmd("addfeed", &["blog", "https://example.com/feed.xml"]),
            )
            .await
            .unwrap();
        out.clear();

        commands.run(&mut state, &cmd("feeds", &[])).await.unwrap();
        assert_eq!(
            out.contents(),
            "* blog\n  url:     https://example.com/feed.xml\n  added:   alice\n  fetched: never\n"
        );
    }

    #[tokio::test]
    async fn test_feeds_empty() {
        let (mut state, out, _dir) = test_state().await;
        Commands::with_defaults()
            .run(&mut state, &cmd("feeds", &[]))
            .await
            .unwrap();
        assert_eq!(out.contents(), "");
    }
}
