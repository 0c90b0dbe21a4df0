//! # API Module
//!
//! HTTP endpoints served by the jukebox's local axum server. They are the
//! externally triggered entry points of the system: a scheduler or a device
//! posts a small JSON body and gets a prose result back.
//!
//! ## Endpoints
//!
//! ### Ingestion
//!
//! - [`get_playlist_tracks`] - `POST /getPlaylistTracks`, fetches a playlist
//!   (optionally a `[start, end)` window of it) and appends its tracks to the
//!   store
//! - [`save_tracks`] - `POST /saveTracks`, appends already fetched tracks
//!
//! ### Credentials
//!
//! - [`get_spotify_token`] - `POST /getSpotifyToken`, authorization code
//!   exchange or refresh for a device user
//! - [`save_token`] - `POST /saveToken`, stores a token the device obtained
//!   itself
//! - [`callback`] - `GET /callback`, OAuth redirect target of `jukebox login`
//!
//! ### Monitoring
//!
//! - [`health`] - `GET /health`, status and version
//!
//! ## Responses
//!
//! Trigger endpoints always answer `200 OK` with a JSON body. Failures inside
//! a bulk operation show up in the `status` field (`complete`, `partial` or
//! `failed`) and in the counts, never as an HTTP error. A body that does not
//! deserialize is answered the same way with status `failed`.

use axum::body::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{types::TriggerResponse, warning};

mod callback;
mod health;
mod token;
mod tracks;

pub use callback::callback;
pub use health::health;
pub use token::get_spotify_token;
pub use token::save_token;
pub use tracks::get_playlist_tracks;
pub use tracks::save_tracks;

fn rejected(e: serde_json::Error) -> TriggerResponse {
    warning!("rejected trigger body: {}", e);
    TriggerResponse::with_status(format!("Invalid request: {}", e), "failed")
}

pub(crate) fn parse_body<T: DeserializeOwned>(body: Bytes) -> Result<T, TriggerResponse> {
    serde_json::from_slice(&body).map_err(rejected)
}

pub(crate) fn parse_value<T: DeserializeOwned>(value: Value) -> Result<T, TriggerResponse> {
    serde_json::from_value(value).map_err(rejected)
}
