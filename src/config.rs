//! Configuration file parser for ~/.config/tidings/config.toml.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos. Invalid feed URLs, a zero update
//! interval, and duplicate key bindings are startup-fatal.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed url '{url}': {reason}")]
    InvalidFeedUrl { url: String, reason: String },

    #[error("seconds_between_updates must be at least 1")]
    InvalidInterval,

    /// Two actions bound to the same key.
    #[error("Key '{0}' is bound to more than one action")]
    DuplicateKeyBinding(String),

    /// A keybinding override names an action that does not exist.
    #[error("Unknown keybinding action '{0}'")]
    UnknownAction(String),
}

// ============================================================================
// Feed Sources
// ============================================================================

/// Raw feed entry as written in the config file: either a bare URL string
/// or a `{ url, name }` table. Normalized into [`FeedSource`] during
/// deserialization so only one shape ever reaches the engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum FeedEntry {
    Url(String),
    Detailed {
        url: String,
        #[serde(default)]
        name: Option<String>,
    },
}

/// A configured feed origin: where to fetch, plus an optional human label
/// distinct from the title the feed reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "FeedEntry")]
pub struct FeedSource {
    pub url: String,
    pub display_name: Option<String>,
}

impl From<FeedEntry> for FeedSource {
    fn from(entry: FeedEntry) -> Self {
        match entry {
            FeedEntry::Url(url) => Self {
                url,
                display_name: None,
            },
            FeedEntry::Detailed { url, name } => Self {
                url,
                display_name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            },
        }
    }
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configured feed sources (bare URL strings or `{ url, name }` tables).
    pub feeds: Vec<FeedSource>,

    /// Optional OPML subscription file; its sources are appended to `feeds`.
    pub opml_file: Option<String>,

    /// Highlight keywords. An article is highlighted when some whitespace
    /// token of its title contains one of these, case-insensitively.
    pub highlights: Vec<String>,

    /// Seconds between background reconciliation cycles.
    pub seconds_between_updates: u64,

    /// Fetched items older than this many days never reach storage.
    pub skip_articles_older_than_days: i64,

    /// Deleted articles older than this many days are physically purged.
    pub days_to_keep_deleted_articles: u32,

    /// Read articles older than this many days are physically purged.
    pub days_to_keep_read_articles: u32,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            opml_file: None,
            highlights: Vec::new(),
            seconds_between_updates: 300,
            skip_articles_older_than_days: 10,
            days_to_keep_deleted_articles: 30,
            days_to_keep_read_articles: 30,
            keybindings: HashMap::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior), logged as warning
    /// - Invalid feed URL or zero interval → `Err(...)`, startup aborts
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to bound memory use on a corrupted file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to detect likely typos
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feeds",
                "opml_file",
                "highlights",
                "seconds_between_updates",
                "skip_articles_older_than_days",
                "days_to_keep_deleted_articles",
                "days_to_keep_read_articles",
                "keybindings",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        config.normalize();
        tracing::info!(
            path = %path.display(),
            feeds = config.feeds.len(),
            highlights = config.highlights.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reject configurations the engine cannot safely run with.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.seconds_between_updates == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        for source in &self.feeds {
            let parsed =
                url::Url::parse(&source.url).map_err(|e| ConfigError::InvalidFeedUrl {
                    url: source.url.clone(),
                    reason: e.to_string(),
                })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::InvalidFeedUrl {
                    url: source.url.clone(),
                    reason: format!("unsupported scheme '{}'", parsed.scheme()),
                });
            }
        }

        Ok(())
    }

    /// Highlight matching is case-insensitive; lower-case the keywords once
    /// here. An empty keyword would match every title, so those are dropped.
    fn normalize(&mut self) {
        self.highlights = self
            .highlights
            .iter()
            .map(|h| h.trim().to_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feeds.is_empty());
        assert!(config.opml_file.is_none());
        assert!(config.highlights.is_empty());
        assert_eq!(config.seconds_between_updates, 300);
        assert_eq!(config.skip_articles_older_than_days, 10);
        assert_eq!(config.days_to_keep_deleted_articles, 30);
        assert_eq!(config.days_to_keep_read_articles, 30);
        assert!(config.keybindings.is_empty());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/tidings_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.seconds_between_updates, 300);
    }

    #[test]
    fn test_feed_entry_shapes_normalize() {
        let dir = std::env::temp_dir().join("tidings_config_test_feeds");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
feeds = [
    "https://blog.rust-lang.org/feed.xml",
    { url = "https://news.ycombinator.com/rss", name = "HN" },
    { url = "https://lobste.rs/rss" },
]
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.feeds.len(), 3);
        assert_eq!(config.feeds[0].url, "https://blog.rust-lang.org/feed.xml");
        assert_eq!(config.feeds[0].display_name, None);
        assert_eq!(config.feeds[1].display_name.as_deref(), Some("HN"));
        assert_eq!(config.feeds[2].display_name, None);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_feed_url_is_fatal() {
        let dir = std::env::temp_dir().join("tidings_config_test_badurl");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "feeds = [\"not a url\"]\n").unwrap();

        let result = Config::load(&path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidFeedUrl { .. }
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let dir = std::env::temp_dir().join("tidings_config_test_scheme");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "feeds = [\"file:///etc/passwd\"]\n").unwrap();

        let result = Config::load(&path);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidFeedUrl { .. }
        ));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_interval_rejected() {
        let dir = std::env::temp_dir().join("tidings_config_test_interval");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "seconds_between_updates = 0\n").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::InvalidInterval));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_highlights_normalized_lowercase() {
        let dir = std::env::temp_dir().join("tidings_config_test_highlights");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "highlights = [\"Rust\", \"  \", \"GO\"]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.highlights, vec!["rust", "go"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("tidings_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "skip_articles_older_than_days = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.skip_articles_older_than_days, 3);
        assert_eq!(config.seconds_between_updates, 300); // default

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("tidings_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("tidings_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "totally_fake_key = \"should not fail\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.feeds.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("tidings_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = "a".repeat(1_048_577);
        std::fs::write(&path, content).unwrap();

        let result = Config::load(&path);
        assert!(matches!(result.unwrap_err(), ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_keybinding_overrides_parsed() {
        let dir = std::env::temp_dir().join("tidings_config_test_keys");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[keybindings]\nquit = \"Q\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.keybindings.get("quit").map(String::as_str), Some("Q"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
