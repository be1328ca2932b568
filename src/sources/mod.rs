//! # Collaborator Interfaces
//!
//! The two remote services are reached only through these traits. A client is
//! constructed once in `main` and passed by reference to the Compendium
//! builder and the reconciler; nothing in the crate holds a global session.
//!
//! All calls are blocking. Mutating calls take `&self` so that HTTP-style
//! clients (and test doubles with interior state) fit the same shape.

use crate::error::SourceError;
use crate::model::{PlaylistItem, PlaylistRef, RawTrack, ScrobbleRecord, TopTrackRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod lastfm;
pub mod snapshot;

pub use lastfm::LastFmClient;
pub use snapshot::SnapshotLibrary;

/// The user's track library on the streaming service.
pub trait LibraryIndexSource {
    /// Every playlist in the library (including "liked" collections).
    fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SourceError>;

    /// Raw track payloads of one playlist, for indexing.
    fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<RawTrack>, SourceError>;

    /// Raw track payloads of the listening history.
    fn history(&self) -> Result<Vec<RawTrack>, SourceError>;

    /// Current entries of a playlist, in playlist order.
    fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, SourceError>;

    fn remove_items(&self, playlist_id: &str, items: &[PlaylistItem]) -> Result<(), SourceError>;

    /// Append `ids` to the playlist, preserving their order.
    fn add_items(&self, playlist_id: &str, ids: &[String]) -> Result<(), SourceError>;

    /// Create an empty playlist and return its id.
    fn create_playlist(&self, name: &str, description: &str) -> Result<String, SourceError>;
}

/// The scrobble-tracking service.
pub trait ScrobbleSource {
    /// Most played tracks for `period`, descending by play count, at most `limit`.
    fn top_tracks(&self, period: Period, limit: usize) -> Result<Vec<TopTrackRecord>, SourceError>;

    /// Scrobbles since `since` (unix seconds) in the order the service returns them.
    /// `None` fetches everything in the window.
    fn recent_tracks(
        &self,
        since: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ScrobbleRecord>, SourceError>;
}

/// Lookback period accepted by the top-tracks call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "overall")]
    Overall,
    #[default]
    #[serde(rename = "7day")]
    Week,
    #[serde(rename = "1month")]
    Month,
    #[serde(rename = "3month")]
    Quarter,
    #[serde(rename = "6month")]
    HalfYear,
    #[serde(rename = "12month")]
    Year,
}

impl Period {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Week => "7day",
            Self::Month => "1month",
            Self::Quarter => "3month",
            Self::HalfYear => "6month",
            Self::Year => "12month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overall" => Ok(Self::Overall),
            "7day" => Ok(Self::Week),
            "1month" => Ok(Self::Month),
            "3month" => Ok(Self::Quarter),
            "6month" => Ok(Self::HalfYear),
            "12month" => Ok(Self::Year),
            other => Err(format!(
                "unknown period `{other}`; expected overall, 7day, 1month, 3month, 6month or 12month"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_round_trips_through_its_wire_name() {
        for period in [
            Period::Overall,
            Period::Week,
            Period::Month,
            Period::Quarter,
            Period::HalfYear,
            Period::Year,
        ] {
            assert_eq!(period.as_str().parse::<Period>(), Ok(period));
            let json = serde_json::to_string(&period).unwrap();
            assert_eq!(json, format!("\"{}\"", period.as_str()));
        }
    }

    #[test]
    fn test_unknown_period_is_rejected() {
        assert!("fortnight".parse::<Period>().is_err());
    }
}
