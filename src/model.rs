//! Shared record types.
//!
//! Raw payloads (`RawTrack`, `PlaylistItem`, `PlaylistRef`) are what the
//! collaborators hand over; everything downstream of
//! [`crate::compendium::normalize`] works on the typed records only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One credited artist of a library track.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A library track reduced to the three fields the matcher needs.
///
/// Identity is `external_id`; the JSON field names stay compatible with
/// existing `ytm_compendium.json` files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LibraryRecord {
    #[serde(rename = "videoId")]
    pub external_id: String,
    pub title: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl LibraryRecord {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>, artists: &[&str]) -> Self {
        Self {
            external_id: external_id.into(),
            title: title.into(),
            artists: artists.iter().map(|name| Artist::new(*name)).collect(),
        }
    }
}

/// Artist entry as it appears in a raw library payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Track payload as delivered by the library source.
///
/// Only `videoId`, `title` and `artists` are typed; every other key is kept in
/// `extra` so snapshots round-trip, and is discarded by normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrack {
    #[serde(rename = "videoId", default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artists: Option<Vec<RawArtist>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A playlist in the user's library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRef {
    #[serde(rename = "playlistId")]
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// An entry currently sitting in a remote playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistItem {
    #[serde(rename = "videoId")]
    pub video_id: String,
    /// Per-entry handle the service uses to remove this exact occurrence.
    #[serde(rename = "setVideoId", default, skip_serializing_if = "Option::is_none")]
    pub set_video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A scrobble inside the recent window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrobbleRecord {
    pub title: String,
    pub artist: String,
    /// Unix seconds.
    pub timestamp: i64,
}

/// A top-tracks entry with its play count ("weight") for the lookback period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopTrackRecord {
    pub title: String,
    pub artist: String,
    pub play_count: u64,
}

/// A scored candidate resolved to a library identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTrack {
    pub title: String,
    pub library_id: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_record_uses_compendium_field_names() {
        let record = LibraryRecord::new("abc123", "Song", &["X"]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"videoId": "abc123", "title": "Song", "artists": [{"name": "X"}]})
        );
    }

    #[test]
    fn test_raw_track_keeps_unknown_fields() {
        let raw: RawTrack = serde_json::from_value(serde_json::json!({
            "videoId": "v1",
            "title": "Song",
            "artists": [{"name": "X", "id": "UC1"}],
            "album": {"name": "LP"},
            "duration": "3:12"
        }))
        .unwrap();

        assert_eq!(raw.video_id.as_deref(), Some("v1"));
        assert!(raw.extra.contains_key("album"));
        assert!(raw.extra.contains_key("duration"));
        let artists = raw.artists.unwrap();
        assert_eq!(artists[0].name.as_deref(), Some("X"));
    }

    #[test]
    fn test_raw_track_tolerates_null_identifier() {
        let raw: RawTrack =
            serde_json::from_str(r#"{"videoId": null, "title": "Gone", "artists": null}"#).unwrap();
        assert!(raw.video_id.is_none());
        assert!(raw.artists.is_none());
    }
}
