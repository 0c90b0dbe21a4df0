//! Shared-device Spotify Jukebox Library
//!
//! This library ingests the tracks of a Spotify playlist into a document store,
//! annotated with the day of week and hour they were added, and plays back a
//! shuffled, time-appropriate selection on a single household device. OAuth
//! credentials are refreshed transparently before every authenticated call.
//!
//! # Modules
//!
//! - `api` - HTTP trigger endpoints served by the local server
//! - `cli` - Command-line interface implementations
//! - `config` - Environment loading and the injected `Settings` struct
//! - `management` - Token store, track ingestion, orchestration and playback
//! - `server` - axum router wiring for the trigger endpoints
//! - `spotify` - Spotify Web API and accounts service clients
//! - `store` - Document store abstraction and its backends
//! - `types` - Data structures and type definitions
//! - `utils` - Pagination, batching, shuffling and other pure helpers
//!
//! # Example
//!
//! ```
//! use jukebox::{config, management::TrackIngestor, store::MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> jukebox::Res<()> {
//!     config::load_env().await?;
//!     let settings = config::Settings::from_env()?;
//!     let ingestor = TrackIngestor::new(Arc::new(MemoryStore::new()));
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod management;
pub mod server;
pub mod spotify;
pub mod store;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Provides a standard error handling pattern throughout the application
/// using a boxed dynamic error trait object. This allows for flexible
/// error handling while maintaining Send + Sync bounds for async contexts.
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Used for progress milestones such as a loaded playlist page or a
/// committed write batch.
///
/// # Example
///
/// ```
/// info!("loading batch {}", index);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("{} tracks saved", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for fatal conditions in the CLI and at server startup, such as a
/// missing required configuration value. Library code never calls it; soft
/// failures inside a bulk operation go through [`warning!`] instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// This is where every degraded unit of work ends up: a playlist page that
/// failed after retries, a batch commit the store rejected, a token exchange
/// that came back empty.
///
/// # Example
///
/// ```
/// warning!("page at offset {} failed: {}", offset, e);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
