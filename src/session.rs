//! Session file (`~/.gatorconfig.json`): who is logged in and where the
//! database lives.
//!
//! Read once at startup and rewritten whenever the current user changes.
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SESSION_FILE_NAME: &str = ".gatorconfig.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("HOME environment variable not set")]
    NoHome,

    #[error("Failed to access session file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid session file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk JSON shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub db_url: String,
    #[serde(default)]
    pub current_user_name: String,
}

/// Loaded session plus the path it is persisted to.
#[derive(Debug, Clone)]
pub struct Session {
    path: PathBuf,
    file: SessionFile,
}

impl Session {
    /// Fresh session with nobody logged in. Nothing is written until
    /// [`Session::set_user`] or [`Session::save`].
    pub fn new(path: impl Into<PathBuf>, db_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file: SessionFile {
                db_url: db_url.into(),
                current_user_name: String::new(),
            },
        }
    }

    /// `~/.gatorconfig.json`
    pub fn default_path() -> Result<PathBuf, SessionError> {
        let home = std::env::var_os("HOME").ok_or(SessionError::NoHome)?;
        Ok(PathBuf::from(home).join(SESSION_FILE_NAME))
    }

    /// Read the session file.
    ///
    /// A missing file yields an empty session. An empty `db_url` in the file
    /// is replaced by `fallback_db_url`.
    pub fn load(path: &Path, fallback_db_url: &str) -> Result<Self, SessionError> {
        let mut file = match std::fs::read_to_string(path) {
            Ok(content) => {
                serde_json::from_str::<SessionFile>(&content).map_err(|source| {
                    SessionError::Parse {
                        path: path.to_path_buf(),
                        source,
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No session file found, starting logged out");
                SessionFile::default()
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if file.db_url.is_empty() {
            file.db_url = fallback_db_url.to_string();
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn db_url(&self) -> &str {
        &self.file.db_url
    }

    /// Name of the logged-in user, if any.
    pub fn current_user(&self) -> Option<&str> {
        Some(self.file.current_user_name.as_str()).filter(|name| !name.is_empty())
    }

    /// Switch the current user and persist immediately.
    ///
    /// The in-memory session only changes once the file has been written.
    pub fn set_user(&mut self, name: &str) -> Result<(), SessionError> {
        let mut file = self.file.clone();
        file.current_user_name = name.to_string();
        write_session(&self.path, &file)?;
        self.file = file;
        tracing::debug!(user = %name, path = %self.path.display(), "Session user updated");
        Ok(())
    }

    /// Write the session atomically (temp file + rename).
    pub fn save(&self) -> Result<(), SessionError> {
        write_session(&self.path, &self.file)
    }
}

fn write_session(path: &Path, file: &SessionFile) -> Result<(), SessionError> {
    let json = serde_json::to_vec_pretty(file).map_err(|source| SessionError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &json).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `content` to `dst` so readers only ever see the old or the new file.
fn atomic_write(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Randomized temp name so a stale or planted file cannot be reused
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let result = (|| {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
        drop(temp_file);

        // On Windows, rename fails if destination exists, so remove it first
        #[cfg(windows)]
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }

        std::fs::rename(&temp_path, dst)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
