//! `register`, `login`, `reset` and `users`.
use std::io::Write;

use super::{Command, CommandError, State};
use crate::storage::{format_timestamp, User};

pub(super) async fn register(state: &mut State, cmd: &Command) -> Result<(), CommandError> {
    let name = cmd.arg(0, "name")?;
    let user = state.db.create_user(name).await?;
    state.session.set_user(&user.name)?;

    tracing::info!(user = %user.name, id = %user.id, "User registered");
    writeln!(state.out, "User created: {}", user.name)?;
    writeln!(state.out, "  id:      {}", user.id)?;
    writeln!(state.out, "  created: {}", format_timestamp(user.created_at))?;
    Ok(())
}

pub(super) async fn login(state: &mut State, cmd: &Command) -> Result<(), CommandError> {
    let name = cmd.arg(0, "name")?;
    let user = state
        .db
        .get_user(name)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(Some(name.to_string())))?;
    state.session.set_user(&user.name)?;

    writeln!(state.out, "Logged in as {}", user.name)?;
    Ok(())
}

/// Delete every user (and by cascade every feed and follow). The session
/// file is left as is; a stale user name simply fails the next lookup.
pub(super) async fn reset(state: &mut State, _cmd: &Command) -> Result<(), CommandError> {
    state.db.reset().await?;
    writeln!(state.out, "Database reset: all users, feeds and follows deleted")?;
    Ok(())
}

pub(super) async fn list_users(state: &mut State, _cmd: &Command) -> Result<(), CommandError> {
    let users = state.db.get_users().await?;
    for line in user_lines(&users, state.session.current_user()) {
        writeln!(state.out, "{line}")?;
    }
    Ok(())
}

/// One `* name` line per user, the logged-in one marked `(current)`.
fn user_lines(users: &[User], current: Option<&str>) -> Vec<String> {
    users
        .iter()
        .map(|user| {
            if Some(user.name.as_str()) == current {
                format!("* {} (current)", user.name)
            } else {
                format!("* {}", user.name)
            }
        })
        .collect()
}
