//! Settings file parser for ~/.config/gator/config.toml.
//!
//! The file is optional: a missing or empty file yields `Settings::default()`.
//! Unknown keys are accepted but logged as warnings, since they are usually typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings file too large: {0}")]
    TooLarge(String),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

// ============================================================================
// Settings
// ============================================================================

/// Tuning knobs for the aggregator.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Feeds taken from the fairness queue on each tick.
    pub feeds_per_tick: u32,

    /// Items printed per successfully fetched feed.
    pub items_per_feed: usize,

    /// Upper bound for one feed request, body read included.
    pub fetch_timeout_secs: u64,

    /// `User-Agent` header sent with every feed request.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feeds_per_tick: 1,
            items_per_feed: 1,
            fetch_timeout_secs: 20,
            user_agent: format!("gator/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 4] = [
        "feeds_per_tick",
        "items_per_feed",
        "fetch_timeout_secs",
        "user_agent",
    ];

    /// Load settings from a TOML file.
    ///
    /// - Missing file → `Ok(Settings::default())`
    /// - Empty file → `Ok(Settings::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)`
    /// - Zero batch size or timeout → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        tracing::info!(
            path = %path.display(),
            feeds_per_tick = settings.feeds_per_tick,
            items_per_feed = settings.items_per_feed,
            "Loaded settings"
        );
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "feeds_per_tick must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_settings(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.feeds_per_tick, 1);
        assert_eq!(settings.items_per_feed, 1);
        assert_eq!(settings.fetch_timeout_secs, 20);
        assert!(settings.user_agent.starts_with("gator/"));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (_dir, path) = write_settings("   \n  \n  ");
        assert_eq!(Settings::load(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_settings_use_defaults_for_missing() {
        let (_dir, path) = write_settings("items_per_feed = 5\n");
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.items_per_feed, 5);
        assert_eq!(settings.feeds_per_tick, 1);
    }

    #[test]
    fn test_full_settings() {
        let (_dir, path) = write_settings(
            r#"
feeds_per_tick = 3
items_per_feed = 2
fetch_timeout_secs = 5
user_agent = "my-agent"
"#,
        );
        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings,
            Settings {
                feeds_per_tick: 3,
                items_per_feed: 2,
                fetch_timeout_secs: 5,
                user_agent: "my-agent".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (_dir, path) = write_settings("this is not [valid toml");
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (_dir, path) = write_settings("items_per_feed = 2\ntotally_fake_key = 1\n");
        assert_eq!(Settings::load(&path).unwrap().items_per_feed, 2);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let (_dir, path) = write_settings("feeds_per_tick = 0\n");
        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (_dir, path) = write_settings(&"a".repeat(1_048_577));
        let err = Settings::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
    }
}
