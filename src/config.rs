//! Configuration file parser for ~/.config/digidex/config.toml.
//!
//! The config file is optional: a missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged, since they
//! are usually typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::app::DEFAULT_PAGE_SIZE;
use crate::catalog::DEFAULT_CATALOG_URL;
use crate::util::validate_http_url;

/// Environment variable that overrides `session_token`.
pub const SESSION_TOKEN_ENV: &str = "DIGIDEX_SESSION_TOKEN";

pub const MAX_PAGE_SIZE: usize = 200;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A value parsed but is out of range.
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// SEC-015: Debug masks `session_token`.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application identifier; scopes the favorite collections in the store.
    pub app_id: String,

    /// Listing endpoint for the catalog.
    pub catalog_url: String,

    /// Entities per page on the Home screen (1..=200).
    pub page_size: usize,

    /// Theme variant name ("dark" or "light").
    pub theme: String,

    /// Custom session token used instead of an anonymous identity.
    /// The `DIGIDEX_SESSION_TOKEN` env var takes precedence.
    pub session_token: Option<String>,

    /// Document store connection.
    pub store: StoreConfig,
}

/// `[store]` table. Disabling the store disables favorites.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub enabled: bool,
    /// SQLite file; defaults to `digidex.db` in the config directory.
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: "digidex".to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            theme: "dark".to_string(),
            session_token: None,
            store: StoreConfig::default(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_id", &self.app_id)
            .field("catalog_url", &self.catalog_url)
            .field("page_size", &self.page_size)
            .field("theme", &self.theme)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("store", &self.store)
            .finish()
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "app_id",
        "catalog_url",
        "page_size",
        "theme",
        "session_token",
        "store",
    ];
    const KNOWN_STORE_KEYS: [&'static str; 2] = ["enabled", "path"];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    ///
    /// Values are not range-checked here; call [`Config::validate`] after
    /// applying command-line overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw, &Self::KNOWN_KEYS, "");
            if let Some(toml::Value::Table(store)) = raw.get("store") {
                warn_unknown_keys(store, &Self::KNOWN_STORE_KEYS, "store.");
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), app_id = %config.app_id, "Loaded configuration");
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// `ConfigError::Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let app_id_ok = !self.app_id.is_empty()
            && self
                .app_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !app_id_ok {
            return Err(ConfigError::Invalid(format!(
                "app_id {:?} must be non-empty and use only letters, digits, '-', '_' or '.'",
                self.app_id
            )));
        }
        if let Err(e) = validate_http_url(&self.catalog_url) {
            return Err(ConfigError::Invalid(format!("catalog_url: {e}")));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::Invalid(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// The session token, env var first.
    pub fn session_token(&self) -> Option<SecretString> {
        self.session_token_with(std::env::var(SESSION_TOKEN_ENV).ok())
    }

    fn session_token_with(&self, env: Option<String>) -> Option<SecretString> {
        env.filter(|t| !t.trim().is_empty())
            .or_else(|| self.session_token.clone().filter(|t| !t.trim().is_empty()))
            .map(SecretString::from)
    }
}

fn warn_unknown_keys(table: &toml::Table, known: &[&str], prefix: &str) {
    for key in table.keys() {
        if !known.contains(&key.as_str()) {
            tracing::warn!(key = %format!("{prefix}{key}"), "Unknown key in config file, ignoring");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
