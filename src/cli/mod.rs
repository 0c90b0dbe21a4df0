//! # CLI Module
//!
//! Command implementations behind the `jukebox` binary. Each command builds
//! its components from an explicit [`Settings`](crate::config::Settings)
//! value, runs one operation and reports through the console macros.
//!
//! ## Commands
//!
//! ### Server
//!
//! - [`serve`] - Runs the HTTP trigger endpoints
//!
//! ### Device Setup
//!
//! - [`login`] - Anonymous device account plus Spotify authorization through
//!   the local `/callback` endpoint
//! - [`device`] - Saves the playback device id for this device's user
//!
//! ### Ingestion
//!
//! - [`ingest`] - Fetches a playlist and appends its tracks to the store
//!
//! ### Playback
//!
//! - [`now`] - Table of the tracks matching the current weekday and hour
//! - [`play`] - Shuffled playback of those tracks
//! - [`pause`] - Pauses playback
//! - [`resume`] - Resumes what the device had queued
//! - [`toggle`] - Interactive single-button play/pause with fades
//!
//! ## Flow
//!
//! ```text
//! CLI Layer (commands, spinners, tables)
//!     ↓
//! Management Layer (ingestion, playback, token store)
//!     ↓
//! Spotify Layer / Document Store
//! ```
//!
//! Fatal conditions (no device identity, unreachable store, invalid server
//! address) end the process through `error!`. Degraded results of bulk
//! operations are printed as warnings and the command still succeeds.

use std::sync::Arc;

use crate::{
    config::Settings,
    store::{DocumentStore, FileStore},
};

mod auth;
mod ingest;
mod playback;
mod serve;

pub use auth::login;
pub use ingest::ingest;
pub use playback::device;
pub use playback::now;
pub use playback::pause;
pub use playback::play;
pub use playback::resume;
pub use playback::toggle;
pub use serve::serve;

pub(crate) fn open_store(settings: &Settings) -> Arc<dyn DocumentStore> {
    Arc::new(FileStore::new(settings.store_dir.clone()))
}
