//! Configuration management for the jukebox.
//!
//! This module handles loading configuration values from environment
//! variables and `.env` files, and turns them into an explicit [`Settings`]
//! value that is handed to every component that talks to Spotify or the
//! document store. Nothing outside this module reads the process
//! environment.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. `.env` file in the current working directory
//! 4. Application defaults (optional values only)

use std::{env, fmt, path::PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SCOPE: &str = "streaming user-read-email user-read-private";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";

/// Loads environment variables from the `.env` files the jukebox knows about.
///
/// Creates the local data directory if it doesn't exist, then loads
/// `jukebox/.env` from it, followed by a `.env` in the working directory.
/// Variables that are already set in the process environment win.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/jukebox/.env`
/// - macOS: `~/Library/Application Support/jukebox/.env`
/// - Windows: `%LOCALAPPDATA%/jukebox/.env`
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or if one of
/// the `.env` files exists but cannot be parsed. Missing files are fine.
pub async fn load_env() -> Result<(), String> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }

    match dotenv::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Returns the jukebox directory inside the platform's local data directory.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("jukebox");
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "{} must be set", name),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Everything the jukebox needs to talk to Spotify and to its store.
///
/// The four credential fields are required: server-triggered flows cannot
/// work without them, so construction fails instead of letting a later
/// token exchange come back empty.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Spotify application id (`SPOTIFY_CLIENT_ID`).
    pub client_id: String,
    /// Spotify application secret (`SPOTIFY_CLIENT_SECRET`).
    pub client_secret: String,
    /// Server-side fallback credential used for batch operations
    /// (`SPOTIFY_REFRESH_TOKEN`).
    pub refresh_token: String,
    /// OAuth callback registered with the Spotify application
    /// (`SPOTIFY_REDIRECT_URI`).
    pub redirect_uri: String,
    pub api_url: String,
    pub token_url: String,
    pub auth_url: String,
    pub scope: String,
    pub server_address: String,
    pub store_dir: PathBuf,
}

impl Settings {
    /// Builds settings from the process environment.
    ///
    /// # Example
    ///
    /// ```
    /// config::load_env().await?;
    /// let settings = config::Settings::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup.
    ///
    /// Empty values count as missing for the required keys and fall back to
    /// the default for the optional ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| value(key).ok_or(ConfigError::Missing(key));
        let optional = |key: &str, default: &str| value(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            client_id: required("SPOTIFY_CLIENT_ID")?,
            client_secret: required("SPOTIFY_CLIENT_SECRET")?,
            refresh_token: required("SPOTIFY_REFRESH_TOKEN")?,
            redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
            api_url: optional("SPOTIFY_API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            token_url: optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL),
            auth_url: optional("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL),
            scope: optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            server_address: optional("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            store_dir: value("JUKEBOX_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir().join("store")),
        })
    }
}
