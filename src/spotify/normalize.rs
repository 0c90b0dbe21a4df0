//! Payload to [`Track`] mapping.
//!
//! Playlist items arrive in several shapes: a full playlist item with a
//! nested `track` object, an item whose `track` is `null` (removed or local
//! files), and already-flattened tracks posted back to the save endpoint.
//! Every optional field has exactly one default here, so nothing upstream
//! has to guard against missing nested data.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde_json::Value;

use crate::types::Track;

/// Shape of a payload before it is turned into a [`Track`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// `{ added_at, track: { name, uri, id, artists, album, .. } }`
    PlaylistItem,
    /// A [`Track`] as stored: `{ addedAt, name, uri, spotifyId, .. }`
    Flattened,
    /// `null`, `false`, `0`, `""` or anything else that is not an object.
    Falsy,
}

pub fn shape_of(value: &Value) -> PayloadShape {
    match value {
        Value::Object(map) if map.contains_key("track") => PayloadShape::PlaylistItem,
        Value::Object(map) if !map.is_empty() => PayloadShape::Flattened,
        _ => PayloadShape::Falsy,
    }
}

fn str_at(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn u64_at(value: &Value, pointer: &str) -> Option<u64> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .filter(|ms| *ms > 0)
}

fn u32_at(value: &Value, pointer: &str) -> Option<u32> {
    value
        .pointer(pointer)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

fn parse_added_at(added_at: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(added_at)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Day of week (Sunday = 0) and hour for an `added_at` timestamp.
pub fn time_bucket_of(added_at: &str) -> (Option<u32>, Option<u32>) {
    match parse_added_at(added_at) {
        Some(t) => (
            Some(t.weekday().num_days_from_sunday()),
            Some(t.hour()),
        ),
        None => (None, None),
    }
}

/// Maps one playlist item from the Spotify API. `channel` is the caller's
/// tag and is copied through as is.
pub fn from_playlist_item(item: &Value, channel: Option<&str>) -> Track {
    let added_at = str_at(item, "/added_at");
    let (added_at_day, added_at_hour) = time_bucket_of(&added_at);

    Track {
        added_at_day,
        added_at_hour,
        name: str_at(item, "/track/name"),
        uri: str_at(item, "/track/uri"),
        spotify_id: str_at(item, "/track/id"),
        duration_ms: u64_at(item, "/track/duration_ms"),
        artist: str_at(item, "/track/artists/0/name"),
        album: str_at(item, "/track/album/name"),
        image_url: str_at(item, "/track/album/images/0/url"),
        channel: channel.map(str::to_string),
        added_at,
    }
}

/// Re-reads a flattened track. Stored buckets win over derived ones so a
/// track without `addedAt` keeps whatever bucket it was saved with.
pub fn from_flattened(value: &Value) -> Track {
    let added_at = str_at(value, "/addedAt");
    let (derived_day, derived_hour) = time_bucket_of(&added_at);

    Track {
        added_at_day: u32_at(value, "/addedAtDay").or(derived_day),
        added_at_hour: u32_at(value, "/addedAtHour").or(derived_hour),
        name: str_at(value, "/name"),
        uri: str_at(value, "/uri"),
        spotify_id: str_at(value, "/spotifyId"),
        duration_ms: u64_at(value, "/durationMs"),
        artist: str_at(value, "/artist"),
        album: str_at(value, "/album"),
        image_url: str_at(value, "/imageUrl"),
        channel: value
            .get("channel")
            .and_then(Value::as_str)
            .map(str::to_string),
        added_at,
    }
}

/// Normalizes any supported payload. Falsy payloads give `None`.
pub fn normalize(value: &Value, channel: Option<&str>) -> Option<Track> {
    match shape_of(value) {
        PayloadShape::PlaylistItem => Some(from_playlist_item(value, channel)),
        PayloadShape::Flattened => Some(from_flattened(value)),
        PayloadShape::Falsy => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn renormalize(track: &Track) -> Track {
        from_flattened(&serde_json::to_value(track).unwrap())
    }

    fn full_item() -> Value {
        json!({
            "added_at": "2021-03-07T21:15:00Z",
            "track": {
                "name": "Song",
                "uri": "spotify:track:abc",
                "id": "abc",
                "duration_ms": 201000,
                "artists": [{ "name": "First" }, { "name": "Second" }],
                "album": { "name": "Record", "images": [{ "url": "https://i/1" }] }
            }
        })
    }

    #[test]
    fn full_item_is_flattened() {
        let track = from_playlist_item(&full_item(), Some("morning"));
        assert_eq!(track.added_at, "2021-03-07T21:15:00Z");
        // 2021-03-07 is a Sunday
        assert_eq!(track.added_at_day, Some(0));
        assert_eq!(track.added_at_hour, Some(21));
        assert_eq!(track.name, "Song");
        assert_eq!(track.uri, "spotify:track:abc");
        assert_eq!(track.spotify_id, "abc");
        assert_eq!(track.duration_ms, Some(201000));
        assert_eq!(track.artist, "First");
        assert_eq!(track.album, "Record");
        assert_eq!(track.image_url, "https://i/1");
        assert_eq!(track.channel.as_deref(), Some("morning"));
    }

    #[test]
    fn missing_added_at_has_no_bucket() {
        let mut item = full_item();
        item["added_at"] = Value::Null;
        let track = from_playlist_item(&item, None);
        assert_eq!(track.added_at, "");
        assert_eq!(track.added_at_day, None);
        assert_eq!(track.added_at_hour, None);
    }

    #[test]
    fn empty_artists_default_to_empty_name() {
        let mut item = full_item();
        item["track"]["artists"] = json!([]);
        assert_eq!(from_playlist_item(&item, None).artist, "");
    }

    #[test]
    fn missing_images_default_to_empty_url() {
        let mut item = full_item();
        item["track"]["album"]["images"] = Value::Null;
        assert_eq!(from_playlist_item(&item, None).image_url, "");
    }

    #[test]
    fn missing_album_defaults_album_and_image() {
        let mut item = full_item();
        item["track"].as_object_mut().unwrap().remove("album");
        let track = from_playlist_item(&item, None);
        assert_eq!(track.album, "");
        assert_eq!(track.image_url, "");
    }

    #[test]
    fn missing_duration_is_none() {
        let mut item = full_item();
        item["track"]["duration_ms"] = json!(0);
        assert_eq!(from_playlist_item(&item, None).duration_ms, None);
    }

    #[test]
    fn null_track_yields_track_without_uri() {
        let item = json!({ "added_at": "2021-03-07T21:15:00Z", "track": null });
        let track = normalize(&item, None).unwrap();
        assert_eq!(track.uri, "");
        assert_eq!(track.name, "");
        assert_eq!(track.added_at_hour, Some(21));
    }

    #[test]
    fn falsy_payloads_are_skipped() {
        for value in [json!(null), json!(false), json!(0), json!(""), json!({})] {
            assert_eq!(normalize(&value, None), None, "{}", value);
        }
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = from_playlist_item(&full_item(), Some("evening"));
        let twice = renormalize(&once);
        assert_eq!(once, twice);

        let value = serde_json::to_value(&once).unwrap();
        assert_eq!(shape_of(&value), PayloadShape::Flattened);
        assert_eq!(normalize(&value, Some("ignored")), Some(once));
    }

    #[test]
    fn flattened_track_keeps_its_stored_bucket() {
        let value = json!({ "uri": "spotify:track:x", "addedAtDay": 3, "addedAtHour": 7 });
        let track = from_flattened(&value);
        assert_eq!(track.added_at_day, Some(3));
        assert_eq!(track.added_at_hour, Some(7));
    }
}
