use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use rand::{Rng, distr::Alphanumeric};

use crate::types::PlaylistWindow;

/// Largest `limit` the playlist tracks endpoint accepts.
pub const PLAYLIST_PAGE_LIMIT: usize = 100;

/// Seconds after which a stored access token is treated as expired.
pub const TOKEN_TTL_SECONDS: i64 = 3600;

/// Undocumented ceiling on the number of uris a play command accepts.
pub const PLAY_URIS_LIMIT: usize = 700;

/// Number of tracks to request for a playlist of `playlist_total` tracks.
///
/// With a window the count is `min(total, end - start) - 1`. The `- 1` can
/// leave the track at the window end unfetched when it opens a new page.
pub fn effective_total(playlist_total: usize, window: Option<PlaylistWindow>) -> usize {
    match window {
        Some(w) => playlist_total.min(w.len()).saturating_sub(1),
        None => playlist_total,
    }
}

/// Pages of `PLAYLIST_PAGE_LIMIT` needed to cover `total` tracks, without an
/// empty trailing request when `total` divides evenly.
pub fn page_count(total: usize) -> usize {
    let full = total / PLAYLIST_PAGE_LIMIT;
    if total % PLAYLIST_PAGE_LIMIT == 0 {
        full
    } else {
        full + 1
    }
}

/// Offset of the page holding the first track of the window.
pub fn first_page_offset(window: Option<PlaylistWindow>) -> usize {
    window
        .map(|w| w.start / PLAYLIST_PAGE_LIMIT * PLAYLIST_PAGE_LIMIT)
        .unwrap_or(0)
}

/// Pages to request from [`first_page_offset`] on for `total` tracks. The
/// span starts at the first fetched page, so the position of `window.start`
/// inside that page counts towards it.
pub fn window_page_count(total: usize, window: Option<PlaylistWindow>) -> usize {
    if total == 0 {
        return 0;
    }
    page_count(window.map_or(0, |w| w.start % PLAYLIST_PAGE_LIMIT) + total)
}

pub fn page_offsets(first_offset: usize, pages: usize) -> Vec<usize> {
    (0..pages)
        .map(|i| first_offset + i * PLAYLIST_PAGE_LIMIT)
        .collect()
}

/// Chunks visited when writing `len` documents with at most `cap` per batch.
/// An exact multiple still visits one trailing empty chunk.
pub fn batch_count(len: usize, cap: usize) -> usize {
    len / cap + 1
}

/// Fisher-Yates shuffle using the thread-local generator.
pub fn shuffle(mut uris: Vec<String>) -> Vec<String> {
    shuffle_with(&mut uris, &mut rand::rng());
    uris
}

pub fn shuffle_with<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let len = items.len();
    for i in (1..len).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Keeps a play command under the uri ceiling.
pub fn cap_track_count(mut uris: Vec<String>) -> Vec<String> {
    if uris.len() > PLAY_URIS_LIMIT {
        uris.truncate(PLAY_URIS_LIMIT - 1);
    }
    uris
}

pub fn is_stale(added_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - added_at > Duration::seconds(TOKEN_TTL_SECONDS)
}

/// `(day of week, hour of day)` pair tracks are bucketed by. Sunday is day 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucket {
    pub day: u32,
    pub hour: u32,
}

impl TimeBucket {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            day: time.weekday().num_days_from_sunday(),
            hour: time.hour(),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

pub fn basic_auth_value(client_id: &str, client_secret: &str) -> String {
    let secret = STANDARD.encode(format!("{}:{}", client_id, client_secret));
    format!("Basic {}", secret)
}

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

pub fn generate_document_id() -> String {
    random_alphanumeric(20)
}

pub fn generate_uid() -> String {
    random_alphanumeric(28)
}

pub fn generate_state() -> String {
    random_alphanumeric(32)
}
