use futures::future::join_all;
use reqwest::{Client, header::HeaderMap};

use crate::{
    config::Settings,
    info,
    spotify::{
        normalize,
        transport::{self, TransportError},
    },
    types::{Outcome, PlaylistLookup, PlaylistTracksPage, PlaylistWindow, Track},
    utils::{self, PLAYLIST_PAGE_LIMIT},
    warning,
};

/// Reads every track of a playlist through the paginated tracks endpoint.
///
/// A fetch is one playlist lookup for the total track count followed by all
/// page requests at once. Pages are fanned out on the current task with
/// `join_all`, so they interleave on the event loop rather than run on
/// separate threads.
///
/// # Pagination
///
/// Pages hold [`PLAYLIST_PAGE_LIMIT`] tracks. With a window the first page is
/// the one holding `window.start`, and the page count covers the span from
/// that page to the last track [`utils::effective_total`] asks for.
///
/// # Partial Results
///
/// Each page is retried by the transport. A page that still fails is logged
/// and skipped, and the other pages are kept: the result is
/// [`Outcome::Partial`] with one failure entry per lost page. Only a failed
/// lookup (or every page failing) gives [`Outcome::Failed`].
///
/// # Ordering
///
/// Every track is tagged with its absolute playlist position
/// (`page offset + index in page`) and the result is sorted by position
/// before the window is applied. A lost page therefore leaves a gap instead
/// of shifting later tracks into the window.
#[derive(Clone)]
pub struct PlaylistFetcher {
    api_url: String,
    client: Client,
}

impl PlaylistFetcher {
    pub fn new(settings: &Settings) -> Self {
        Self::with_client(&settings.api_url, Client::new())
    }

    pub fn with_client(api_url: &str, client: Client) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Total number of tracks in the playlist.
    pub async fn playlist_total(
        &self,
        playlist_id: &str,
        headers: &HeaderMap,
    ) -> Result<usize, TransportError> {
        let request = self
            .client
            .get(format!("{}/playlists/{}", self.api_url, playlist_id))
            .headers(headers.clone())
            .query(&[("fields", "tracks.total")])
            .build()?;
        let response = transport::send_with_retry(&self.client, request).await?;
        let lookup = response.json::<PlaylistLookup>().await?;
        Ok(lookup.tracks.total)
    }

    async fn fetch_page(
        &self,
        playlist_id: &str,
        headers: &HeaderMap,
        offset: usize,
    ) -> Result<PlaylistTracksPage, TransportError> {
        let request = self
            .client
            .get(format!("{}/playlists/{}/tracks", self.api_url, playlist_id))
            .headers(headers.clone())
            .query(&[("limit", PLAYLIST_PAGE_LIMIT), ("offset", offset)])
            .build()?;
        let response = transport::send_with_retry(&self.client, request).await?;
        Ok(response.json::<PlaylistTracksPage>().await?)
    }

    /// Fetches and normalizes the tracks of `playlist_id`.
    ///
    /// # Arguments
    ///
    /// * `playlist_id` - Spotify id of the playlist
    /// * `headers` - Bearer headers, see `TokenBroker::auth_headers`
    /// * `window` - Optional `[start, end)` slice of the playlist to keep
    /// * `channel` - Caller tag copied onto every track
    pub async fn fetch(
        &self,
        playlist_id: &str,
        headers: &HeaderMap,
        window: Option<PlaylistWindow>,
        channel: Option<&str>,
    ) -> Outcome<Vec<Track>> {
        let playlist_total = match self.playlist_total(playlist_id, headers).await {
            Ok(total) => total,
            Err(e) => {
                warning!("playlist {} lookup failed: {}", playlist_id, e);
                return Outcome::Failed(format!("playlist lookup failed: {}", e));
            }
        };

        let total = utils::effective_total(playlist_total, window);
        let offsets = utils::page_offsets(
            utils::first_page_offset(window),
            utils::window_page_count(total, window),
        );
        info!(
            "playlist {} has {} tracks, requesting {} pages",
            playlist_id,
            playlist_total,
            offsets.len()
        );

        let results = join_all(offsets.iter().map(|&offset| async move {
            (offset, self.fetch_page(playlist_id, headers, offset).await)
        }))
        .await;

        let mut positioned: Vec<(usize, Track)> = Vec::new();
        let mut failures = Vec::new();
        for (index, (offset, result)) in results.into_iter().enumerate() {
            match result {
                Ok(page) => {
                    positioned.extend(page.items.iter().enumerate().filter_map(|(i, item)| {
                        normalize::normalize(item, channel).map(|track| (offset + i, track))
                    }));
                    info!("loading batch {}", index);
                }
                Err(e) => {
                    warning!("page at offset {} failed: {}", offset, e);
                    failures.push(format!("page at offset {}: {}", offset, e));
                }
            }
        }

        positioned.sort_by_key(|(position, _)| *position);
        let tracks: Vec<Track> = positioned
            .into_iter()
            .filter(|(position, _)| window.is_none_or(|w| w.contains(*position)))
            .map(|(_, track)| track)
            .collect();

        if failures.is_empty() {
            Outcome::Complete(tracks)
        } else if failures.len() == offsets.len() {
            Outcome::Failed(format!("all {} pages failed", offsets.len()))
        } else {
            Outcome::Partial {
                value: tracks,
                failures,
            }
        }
    }
}
