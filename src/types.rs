use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// One playlist entry as it is stored in the `tracks` collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Track {
    pub added_at: String,
    pub added_at_day: Option<u32>,
    pub added_at_hour: Option<u32>,
    pub name: String,
    pub uri: String,
    pub spotify_id: String,
    pub duration_ms: Option<u64>,
    pub artist: String,
    pub album: String,
    pub image_url: String,
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// First login: an authorization code is exchanged and a refresh token comes back.
    Access,
    /// Refresh cycle: only a new access token comes back.
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub access: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// The `users/{uid}` document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDocument {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub tokens: Option<TokenRecord>,
    pub device_id: Option<String>,
}

/// `[start, end)` slice of a playlist to keep after fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistWindow {
    pub start: usize,
    pub end: usize,
}

impl PlaylistWindow {
    /// A window only exists when both bounds are given and it is non-empty.
    pub fn from_bounds(start: Option<usize>, end: Option<usize>) -> Option<Self> {
        match (start, end) {
            (Some(start), Some(end)) if start < end => Some(Self { start, end }),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }
}

/// Response of `GET /playlists/{id}?fields=tracks.total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistLookup {
    pub tracks: PlaylistTotal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTotal {
    pub total: usize,
}

/// Response of `GET /playlists/{id}/tracks`. Items stay untyped so a single
/// odd entry cannot fail the whole page; `spotify::normalize` reads them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistTracksPage {
    pub items: Vec<Value>,
    pub offset: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenEndpointResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
}

/// Tokens handed out by the accounts service. Both strings are empty when the
/// exchange failed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenGrant {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub playlist_id: String,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
    #[serde(default, alias = "channelTag", alias = "nova")]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveTracksRequest {
    pub tracks: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub token_type: TokenType,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTokenRequest {
    #[serde(default)]
    pub token: Option<String>,
    pub token_type: TokenType,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user_id: String,
}

/// Body returned by every trigger endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TriggerResponse {
    pub fn message(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            status: None,
        }
    }

    pub fn with_status(result: impl Into<String>, status: &str) -> Self {
        Self {
            result: result.into(),
            status: Some(status.to_string()),
        }
    }
}

/// Result of one suspension point: every unit of work either fully
/// succeeded, succeeded for some of its parts, or produced nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Complete(T),
    Partial { value: T, failures: Vec<String> },
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Complete(_) => "complete",
            Outcome::Partial { .. } => "partial",
            Outcome::Failed(_) => "failed",
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Complete(value) | Outcome::Partial { value, .. } => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Complete(value) | Outcome::Partial { value, .. } => Some(value),
            Outcome::Failed(_) => None,
        }
    }

    pub fn failures(&self) -> Vec<&str> {
        match self {
            Outcome::Complete(_) => Vec::new(),
            Outcome::Partial { failures, .. } => failures.iter().map(String::as_str).collect(),
            Outcome::Failed(reason) => vec![reason.as_str()],
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Complete(value) => Outcome::Complete(f(value)),
            Outcome::Partial { value, failures } => Outcome::Partial {
                value: f(value),
                failures,
            },
            Outcome::Failed(reason) => Outcome::Failed(reason),
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn into_value_or_default(self) -> T {
        self.into_value().unwrap_or_default()
    }
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub added: String,
}

impl From<&Track> for TrackTableRow {
    fn from(track: &Track) -> Self {
        Self {
            name: track.name.clone(),
            artist: track.artist.clone(),
            album: track.album.clone(),
            added: track.added_at.clone(),
        }
    }
}

/// Login attempt waiting for its OAuth callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLogin {
    pub state: String,
    pub user_id: String,
    pub token: Option<TokenResponse>,
}
