use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use gator::commands::{Command, CommandError, Commands, State};
use gator::config::Settings;
use gator::session::Session;
use gator::storage::Database;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Get the config directory path (~/.config/gator/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("gator"))
}

#[derive(Parser, Debug)]
#[command(
    name = "gator",
    version,
    about = "Command-line RSS/Atom feed aggregator",
    after_help = "Commands:\n  register <name>       create a user and log in\n  login <name>          switch to an existing user\n  users                 list users\n  reset                 delete all users, feeds and follows\n  addfeed <name> <url>  add a feed and follow it\n  feeds                 list all feeds\n  follow <url>          follow an existing feed\n  unfollow <url>        stop following a feed\n  following             list feeds you follow\n  agg <interval>        poll feeds every interval (e.g. 30s, 1m)"
)]
struct Args {
    /// Session file holding the current user and database URL
    #[arg(long, value_name = "FILE", env = "GATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Settings file (defaults to ~/.config/gator/config.toml)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Command to run
    command: String,

    /// Arguments for the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Cancel `token` on Ctrl-C or SIGTERM.
async fn wait_for_shutdown(token: CancellationToken) {
    #[cfg(unix)]
    {
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Received shutdown signal");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help / --version print to stdout and succeed
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let session_path = match args.config {
        Some(path) => path,
        None => Session::default_path()?,
    };
    let default_db = config_dir.join("gator.db");
    let default_db = default_db
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let session = Session::load(&session_path, default_db)?;
    tracing::debug!(
        session = %session.path().display(),
        db = %session.db_url(),
        user = ?session.current_user(),
        "Session loaded"
    );

    let settings_path = args
        .settings
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from '{}'", settings_path.display()))?;

    let db = Database::open(session.db_url())
        .await
        .map_err(CommandError::StoreUnavailable)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    let mut state = State {
        db,
        session,
        settings,
        out: Box::new(std::io::stdout()),
        shutdown,
    };

    let commands = Commands::with_defaults();
    let command = Command::new(args.command, args.args);
    if let Err(e) = commands.run(&mut state, &command).await {
        if matches!(e, CommandError::CommandNotFound(_)) {
            eprintln!("Available commands: {}", commands.names().join(", "));
        }
        return Err(e.into());
    }
    Ok(())
}
