//! # Spotify Integration Module
//!
//! This module is the integration layer between the jukebox and Spotify's
//! services. It covers the two places where the jukebox talks to Spotify:
//! the accounts service, which hands out access tokens, and the Web API,
//! which serves playlist pages and accepts playback commands.
//!
//! ## Architecture
//!
//! ```text
//! Management Layer (ingestion, playback, token store)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (authorization code + refresh token grants)
//!     ├── Playlist Fetching (concurrent pagination)
//!     ├── Normalization (payload → Track)
//!     └── Player Commands (play, pause)
//!          ↓
//! Transport (reqwest, retry up to 3 times)
//!          ↓
//! Spotify Web API / Accounts Service
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - The [`TokenBroker`](auth::TokenBroker):
//! - **Authorization Code Exchange**: First login of a device, yields an access
//!   and a refresh token
//! - **Token Refresh**: Yields a fresh access token, never a replacement
//!   refresh token
//! - **Server Headers**: Bearer headers for server-triggered batch work, built
//!   from the configured fallback refresh token
//! - **Persistence**: Results are merge-written through the token store
//!
//! ### Playlist Module
//!
//! [`playlist`] - The [`PlaylistFetcher`](playlist::PlaylistFetcher):
//! - **Minimal Requests**: Page count derived from the playlist total and the
//!   optional window
//! - **Fan-out**: All pages requested at once
//! - **Partial Results**: Lost pages are reported, not fatal
//! - **Resequencing**: Tracks ordered by playlist position before slicing
//!
//! ### Normalization Module
//!
//! [`normalize`] - One mapping function per payload shape, with one default
//! per optional field.
//!
//! ### Player Module
//!
//! [`player`] - `PUT /me/player/play` and `PUT /me/player/pause`.
//!
//! ### Transport Module
//!
//! [`transport`] - Shared retry policy:
//! - **Network Failures**: Retried for every method
//! - **Server Errors / Rate Limits**: Retried for idempotent methods only
//! - **Retry-After**: Respected up to two minutes
//!
//! ## API Coverage
//!
//! - `POST /api/token` - Authorization code and refresh token grants
//! - `GET /playlists/{id}` - Playlist total
//! - `GET /playlists/{id}/tracks` - Playlist pages
//! - `PUT /me/player/play` - Start playback of a uri list
//! - `PUT /me/player/pause` - Pause playback
//!
//! ## Error Types
//!
//! - **[`TransportError`](transport::TransportError)** - Network failures and
//!   final non-success statuses
//! - **[`Outcome`](crate::types::Outcome)** - Complete / partial / failed
//!   result of token and playlist operations

pub mod auth;
pub mod normalize;
pub mod player;
pub mod playlist;
pub mod transport;
