//! Command dispatch: a name → handler registry plus the logged-in adapter.
//!
//! Handlers are plain function pointers returning boxed futures. A
//! [`Handler`] is either `Plain` or `LoggedIn`; the latter receives the
//! resolved [`User`] as a third argument, looked up from the session on
//! every call. Shared process state travels in [`State`].

mod agg;
mod feeds;
mod follows;
mod users;

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io::Write;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::feed::FetchError;
use crate::scheduler::SchedulerError;
use crate::session::{Session, SessionError};
use crate::storage::{Database, DatabaseError, User};
use crate::util::UrlValidationError;

pub use agg::parse_interval;

// ============================================================================
// Error Types
// ============================================================================

/// Everything a command can fail with. Each one ends the process with
/// exit status 1 and its message on stderr.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    CommandNotFound(String),

    #[error("'{command}' requires a <{what}> argument")]
    MissingArgument { command: String, what: &'static str },

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    #[error("user not found: {}", .0.as_deref().unwrap_or("nobody is logged in"))]
    UserNotFound(Option<String>),

    #[error("no feed with URL '{0}'")]
    FeedNotFound(String),

    #[error("a feed with URL '{0}' already exists")]
    DuplicateFeed(String),

    #[error("already following '{0}'")]
    AlreadyFollowing(String),

    #[error("not following '{0}'")]
    NotFollowing(String),

    #[error("invalid interval '{input}': {reason}")]
    InvalidInterval { input: String, reason: String },

    #[error(transparent)]
    InvalidUrl(#[from] UrlValidationError),

    #[error("fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(DatabaseError),

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<DatabaseError> for CommandError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::DuplicateUser(name) => CommandError::DuplicateUser(name),
            DatabaseError::DuplicateFeed(url) => CommandError::DuplicateFeed(url),
            other => CommandError::StoreUnavailable(other),
        }
    }
}

impl From<SchedulerError> for CommandError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Store(e) => e.into(),
            SchedulerError::Output(e) => CommandError::Io(e),
        }
    }
}

// ============================================================================
// State and Command
// ============================================================================

/// Process-wide state handed to every handler.
pub struct State {
    pub db: Database,
    pub session: Session,
    pub settings: Settings,
    /// User-facing output (stdout in the binary)
    pub out: Box<dyn Write + Send + Sync>,
    /// Cancelled on Ctrl-C / SIGTERM; stops `agg`
    pub shutdown: CancellationToken,
}

/// One CLI invocation: `gator <name> <args...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Positional argument `index`, or `MissingArgument` naming `what`.
    pub fn arg(&self, index: usize, what: &'static str) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::MissingArgument {
                command: self.name.clone(),
                what,
            })
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type HandlerFuture<'a> = BoxFuture<'a, Result<(), CommandError>>;

/// `(state, command) -> Result`
pub type PlainHandler = for<'a> fn(&'a mut State, &'a Command) -> HandlerFuture<'a>;

/// `(state, command, user) -> Result`
pub type UserHandler = for<'a> fn(&'a mut State, &'a Command, User) -> HandlerFuture<'a>;

#[derive(Clone, Copy)]
pub enum Handler {
    Plain(PlainHandler),
    LoggedIn(UserHandler),
}

/// Wrap a handler that needs the current user.
///
/// The result behaves like any plain handler: it resolves the session user
/// first and fails with `UserNotFound` if that is impossible.
pub fn logged_in(inner: UserHandler) -> Handler {
    Handler::LoggedIn(inner)
}

impl Handler {
    pub async fn call(self, state: &mut State, cmd: &Command) -> Result<(), CommandError> {
        match self {
            Handler::Plain(f) => f(state, cmd).await,
            Handler::LoggedIn(f) => {
                let user = current_user(state).await?;
                f(state, cmd, user).await
            }
        }
    }
}

/// Resolve the session's user name to a stored user.
///
/// Fails with `UserNotFound(None)` when nobody is logged in and
/// `UserNotFound(Some(name))` when the user was deleted after logging in.
pub async fn current_user(state: &State) -> Result<User, CommandError> {
    let name = state
        .session
        .current_user()
        .ok_or(CommandError::UserNotFound(None))?;
    state
        .db
        .get_user(name)
        .await?
        .ok_or_else(|| CommandError::UserNotFound(Some(name.to_string())))
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Default)]
pub struct Commands {
    handlers: HashMap<String, Handler>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in command.
    pub fn with_defaults() -> Self {
        let mut commands = Self::new();
        commands.register("register", Handler::Plain(|s, c| Box::pin(users::register(s, c))));
        commands.register("login", Handler::Plain(|s, c| Box::pin(users::login(s, c))));
        commands.register("reset", Handler::Plain(|s, c| Box::pin(users::reset(s, c))));
        commands.register("users", Handler::Plain(|s, c| Box::pin(users::list_users(s, c))));
        commands.register("feeds", Handler::Plain(|s, c| Box::pin(feeds::list_feeds(s, c))));
        commands.register("addfeed", logged_in(|s, c, u| Box::pin(feeds::add_feed(s, c, u))));
        commands.register("follow", logged_in(|s, c, u| Box::pin(follows::follow(s, c, u))));
        commands.register("unfollow", logged_in(|s, c, u| Box::pin(follows::unfollow(s, c, u))));
        commands.register("following", logged_in(|s, c, u| Box::pin(follows::following(s, c, u))));
        commands.register("agg", Handler::Plain(|s, c| Box::pin(agg::agg(s, c))));
        commands
    }

    /// Add or replace the handler for `name`. The last registration wins.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Registered command names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Dispatch `cmd`, returning the handler's result unchanged.
    pub async fn run(&self, state: &mut State, cmd: &Command) -> Result<(), CommandError> {
        let handler = *self
            .handlers
            .get(&cmd.name)
            .ok_or_else(|| CommandError::CommandNotFound(cmd.name.clone()))?;
        tracing::debug!(command = %cmd.name, args = cmd.args.len(), "Dispatching command");
        handler.call(state, cmd).await
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{cmd, test_state};
    use super::*;

    fn fail_missing<'a>(_: &'a mut State, c: &'a Command) -> HandlerFuture<'a> {
        Box::pin(async move { Err::<(), _>(c.arg(0, "first").unwrap_err()) })
    }

    fn fail_feed<'a>(_: &'a mut State, _: &'a Command) -> HandlerFuture<'a> {
        Box::pin(async move { Err::<(), _>(CommandError::FeedNotFound("second".to_string())) })
    }

    fn succeed<'a>(_: &'a mut State, _: &'a Command) -> HandlerFuture<'a> {
        Box::pin(async move { Ok::<(), CommandError>(()) })
    }

    fn print_user<'a>(s: &'a mut State, _: &'a Command, u: User) -> HandlerFuture<'a> {
        Box::pin(async move {
            writeln!(s.out, "hello {}", u.name)?;
            Ok::<(), CommandError>(())
        })
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let (mut state, _, _dir) = test_state().await;
        let commands = Commands::new();
        let err = commands
            .run(&mut state, &cmd("nope", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::CommandNotFound(ref n) if n == "nope"));
    }

    #[tokio::test]
    async fn test_handler_result_is_returned_verbatim() {
        let (mut state, _, _dir) = test_state().await;
        let mut commands = Commands::new();
        commands.register("ok", Handler::Plain(succeed));
        commands.register("bad", Handler::Plain(fail_missing));

        commands.run(&mut state, &cmd("ok", &[])).await.unwrap();
        let err = commands.run(&mut state, &cmd("bad", &[])).await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::MissingArgument { ref command, what: "first" } if command == "bad"
        ));
    }

    #[tokio::test]
    async fn test_reregistering_overwrites() {
        let (mut state, _, _dir) = test_state().await;
        let mut commands = Commands::new();
        commands.register("x", Handler::Plain(fail_missing));
        commands.register("x", Handler::Plain(fail_feed));

        assert_eq!(commands.names(), vec!["x"]);
        let err = commands.run(&mut state, &cmd("x", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::FeedNotFound(_)));
    }

    #[tokio::test]
    async fn test_logged_in_without_session_user() {
        let (mut state, out, _dir) = test_state().await;
        let mut commands = Commands::new();
        commands.register("me", logged_in(print_user));

        let err = commands.run(&mut state, &cmd("me", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::UserNotFound(None)));
        assert_eq!(out.contents(), "");
    }

    #[tokio::test]
    async fn test_logged_in_with_deleted_user() {
        let (mut state, _, _dir) = test_state().await;
        state.db.create_user("ghost").await.unwrap();
        state.session.set_user("ghost").unwrap();
        state.db.reset().await.unwrap();

        let mut commands = Commands::new();
        commands.register("me", logged_in(print_user));
        let err = commands.run(&mut state, &cmd("me", &[])).await.unwrap_err();
        assert!(matches!(err, CommandError::UserNotFound(Some(ref n)) if n == "ghost"));
    }

    #[tokio::test]
    async fn test_logged_in_passes_resolved_user() {
        let (mut state, out, _dir) = test_state().await;
        state.db.create_user("alice").await.unwrap();
        state.session.set_user("alice").unwrap();

        let mut commands = Commands::new();
        commands.register("me", logged_in(print_user));
        commands.run(&mut state, &cmd("me", &[])).await.unwrap();
        assert_eq!(out.contents(), "hello alice\n");
    }

    #[test]
    fn test_default_command_table() {
        let commands = Commands::with_defaults();
        assert_eq!(
            commands.names(),
            vec![
                "addfeed",
                "agg",
                "feeds",
                "follow",
                "following",
                "login",
                "register",
                "reset",
                "unfollow",
                "users"
            ]
        );
    }

    #[test]
    fn test_command_arg() {
        let c = cmd("addfeed", &["blog"]);
        assert_eq!(c.arg(0, "name").unwrap(), "blog");
        assert!(matches!(
            c.arg(1, "url"),
            Err(CommandError::MissingArgument { what: "url", .. })
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CommandError::UserNotFound(None).to_string(),
            "user not found: nobody is logged in"
        );
        assert_eq!(
            CommandError::UserNotFound(Some("bob".into())).to_string(),
            "user not found: bob"
        );
        let dup: CommandError = DatabaseError::DuplicateUser("alice".into()).into();
        assert!(matches!(dup, CommandError::DuplicateUser(_)));
    }
}
