use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    info,
    management::TokenStore,
    spotify::{
        auth::TokenBroker,
        player::PlayerClient,
        transport::TransportError,
    },
    store::{self, DocumentStore, Filter, StoreError, TRACKS},
    types::{TokenRecord, TokenRequest, TokenType, Track},
    utils::{self, TimeBucket},
    warning,
};

pub const DEBOUNCE_MS: i64 = 3200;
pub const FADE_IN_MS: i64 = 2700;
pub const FADE_OUT_MS: i64 = 3000;

#[derive(Debug)]
pub enum PlaybackError {
    NotLoggedIn(String),
    NoTracks(TimeBucket),
    Store(StoreError),
    Transport(TransportError),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::NotLoggedIn(uid) => write!(f, "user {} has no stored token", uid),
            PlaybackError::NoTracks(bucket) => write!(
                f,
                "no tracks added on day {} at hour {}",
                bucket.day, bucket.hour
            ),
            PlaybackError::Store(e) => write!(f, "{}", e),
            PlaybackError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PlaybackError {}

impl From<StoreError> for PlaybackError {
    fn from(err: StoreError) -> Self {
        PlaybackError::Store(err)
    }
}

impl From<TransportError> for PlaybackError {
    fn from(err: TransportError) -> Self {
        PlaybackError::Transport(err)
    }
}

pub fn is_stale(record: &TokenRecord, now: DateTime<Utc>) -> bool {
    utils::is_stale(record.added_at, now)
}

/// Device-side playback for one user: credential freshness, track selection
/// and the play/pause commands.
#[derive(Clone)]
pub struct PlaybackSession {
    user_id: String,
    store: Arc<dyn DocumentStore>,
    broker: TokenBroker,
    player: PlayerClient,
}

impl PlaybackSession {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn DocumentStore>,
        broker: TokenBroker,
        player: PlayerClient,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            broker,
            player,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn tokens(&self) -> &TokenStore {
        self.broker.token_store()
    }

    /// Access token to use right now.
    ///
    /// A token older than an hour is refreshed first and the call waits for
    /// the new one. When the refresh yields nothing the stored token is
    /// returned and the following call fails on its own.
    pub async fn access_token(&self) -> Result<String, PlaybackError> {
        let record = self
            .tokens()
            .load(&self.user_id)
            .await?
            .ok_or_else(|| PlaybackError::NotLoggedIn(self.user_id.clone()))?;

        if !is_stale(&record, self.store.server_time()) {
            return Ok(record.access);
        }

        info!("access token expired, refreshing");
        let response = self
            .broker
            .obtain_token(&TokenRequest {
                token_type: TokenType::Refresh,
                code: None,
                refresh_token: record.refresh.clone(),
                user_id: self.user_id.clone(),
            })
            .await;

        if response.token.is_empty() {
            warning!("refresh failed, using the stored token");
            Ok(record.access)
        } else {
            Ok(response.token)
        }
    }

    /// Tracks added in the same weekday and hour as `bucket`.
    pub async fn select_tracks(&self, bucket: TimeBucket) -> Result<Vec<Track>, PlaybackError> {
        let filters = [
            Filter::eq("addedAtDay", bucket.day),
            Filter::eq("addedAtHour", bucket.hour),
        ];
        let docs = self.store.query(TRACKS, &filters).await?;
        let tracks = docs
            .into_iter()
            .map(store::from_document::<Track>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    /// Plays a shuffled selection of the tracks for `bucket` on the saved
    /// device. Returns the number of uris sent.
    pub async fn play_bucket(&self, bucket: TimeBucket) -> Result<usize, PlaybackError> {
        let tracks = self.select_tracks(bucket).await?;
        if tracks.is_empty() {
            return Err(PlaybackError::NoTracks(bucket));
        }

        let uris = tracks.into_iter().map(|track| track.uri).collect();
        let uris = utils::cap_track_count(utils::shuffle(uris));
        let count = uris.len();

        let device_id = self
            .tokens()
            .user(&self.user_id)
            .await?
            .and_then(|user| user.device_id);
        let token = self.access_token().await?;
        self.player
            .play(&token, device_id.as_deref(), Some(uris))
            .await?;
        Ok(count)
    }

    pub async fn play_now(&self) -> Result<usize, PlaybackError> {
        self.play_bucket(TimeBucket::at(self.store.server_time()))
            .await
    }

    /// Resumes whatever the device had queued.
    pub async fn resume(&self) -> Result<(), PlaybackError> {
        let token = self.access_token().await?;
        self.player.play(&token, None, None).await?;
        Ok(())
    }

    pub async fn pause(&self) -> Result<(), PlaybackError> {
        let token = self.access_token().await?;
        self.player.pause(&token).await?;
        Ok(())
    }

    /// Runs a command from [`PlaybackToggle`]. Every `Play` selects a fresh
    /// shuffle of the current time bucket. `Pause` reports zero tracks.
    pub async fn apply(&self, command: PlayerCommand) -> Result<usize, PlaybackError> {
        match command {
            PlayerCommand::Play => self.play_now().await,
            PlayerCommand::Pause => self.pause().await.map(|_| 0),
        }
    }

    pub async fn save_device_id(&self, device_id: &str) -> Result<(), PlaybackError> {
        self.tokens()
            .save_device_id(&self.user_id, device_id)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleState {
    Idle,
    FadingIn { since: DateTime<Utc> },
    Playing,
    FadingOut { since: DateTime<Utc> },
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    Play,
    Pause,
}

/// Single-button play/pause with fades.
///
/// A press flips between fading in and fading out; presses closer than
/// [`DEBOUNCE_MS`] to the previous accepted one are ignored. The player
/// command is only due once the fade has run its course, which `tick`
/// reports. Time is passed in so the machine can be driven by any clock.
#[derive(Debug, Clone)]
pub struct PlaybackToggle {
    state: ToggleState,
    last_press: Option<DateTime<Utc>>,
}

impl Default for PlaybackToggle {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackToggle {
    pub fn new() -> Self {
        Self {
            state: ToggleState::Idle,
            last_press: None,
        }
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self.state,
            ToggleState::FadingIn { .. } | ToggleState::Playing
        )
    }

    /// Returns whether the press was accepted.
    pub fn press(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_press {
            if (now - last).num_milliseconds() < DEBOUNCE_MS {
                return false;
            }
        }

        self.last_press = Some(now);
        self.state = if self.is_playing() {
            ToggleState::FadingOut { since: now }
        } else {
            ToggleState::FadingIn { since: now }
        };
        true
    }

    /// Advances fades and returns the player command that became due.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PlayerCommand> {
        match self.state {
            ToggleState::FadingIn { since } if (now - since).num_milliseconds() >= FADE_IN_MS => {
                self.state = ToggleState::Playing;
                Some(PlayerCommand::Play)
            }
            ToggleState::FadingOut { since } if (now - since).num_milliseconds() >= FADE_OUT_MS => {
                self.state = ToggleState::Paused;
                Some(PlayerCommand::Pause)
            }
            _ => None,
        }
    }
}
