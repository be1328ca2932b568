//! File-backed `LibraryIndexSource`.
//!
//! The streaming service has no public API, so the bundled library source
//! works on an exported snapshot of the account:
//!
//! ```json
//! {
//!   "playlists": [
//!     {"playlistId": "PL…", "title": "Liked Music", "tracks": [{"videoId": "…", "title": "…", "artists": [{"name": "…"}]}]}
//!   ],
//!   "history": [{"videoId": "…", "title": "…", "artists": [{"name": "…"}]}]
//! }
//! ```
//!
//! Reads load the file on every call. Mutations rewrite it atomically, so a
//! sync tool watching the file sees either the old or the new state.

use super::LibraryIndexSource;
use crate::error::SourceError;
use crate::model::{PlaylistItem, PlaylistRef, RawTrack};
use crate::storage::{self, LoadOutcome};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

const SERVICE: &str = "library snapshot";
const SET_VIDEO_ID: &str = "setVideoId";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub playlists: Vec<SnapshotPlaylist>,
    #[serde(default)]
    pub history: Vec<RawTrack>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPlaylist {
    #[serde(rename = "playlistId")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
}

impl LibrarySnapshot {
    fn playlist(&self, id: &str) -> Result<&SnapshotPlaylist, SourceError> {
        self.playlists
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    fn playlist_mut(&mut self, id: &str) -> Result<&mut SnapshotPlaylist, SourceError> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }

    /// Any known payload for `video_id`, from playlists first, then history.
    fn known_track(&self, video_id: &str) -> Option<&RawTrack> {
        self.playlists
            .iter()
            .flat_map(|p| p.tracks.iter())
            .chain(self.history.iter())
            .find(|t| t.video_id.as_deref() == Some(video_id))
    }
}

fn not_found(id: &str) -> SourceError {
    SourceError::Api {
        service: SERVICE,
        code: 404,
        message: format!("no playlist with id {id}"),
    }
}

fn set_video_id(track: &RawTrack) -> Option<String> {
    track
        .extra
        .get(SET_VIDEO_ID)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn as_item(track: &RawTrack) -> Option<PlaylistItem> {
    Some(PlaylistItem {
        video_id: track.video_id.clone()?,
        set_video_id: set_video_id(track),
        title: track.title.clone(),
    })
}

/// Library source backed by a JSON export on disk.
#[derive(Debug, Clone)]
pub struct SnapshotLibrary {
    path: PathBuf,
}

impl SnapshotLibrary {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<LibrarySnapshot, SourceError> {
        match storage::load_json(&self.path) {
            LoadOutcome::Loaded(snapshot) => Ok(snapshot),
            LoadOutcome::Empty => Ok(LibrarySnapshot::default()),
            LoadOutcome::Missing => Err(SourceError::unavailable(
                SERVICE,
                format!("{} does not exist", self.path.display()),
            )),
            LoadOutcome::Corrupt(err) => Err(SourceError::malformed(SERVICE, format!("{err:#}"))),
        }
    }

    fn save(&self, snapshot: &LibrarySnapshot) -> Result<(), SourceError> {
        storage::save_json_atomic(snapshot, &self.path)
            .map_err(|err| SourceError::unavailable(SERVICE, format!("{err:#}")))
    }
}

impl LibraryIndexSource for SnapshotLibrary {
    fn list_playlists(&self) -> Result<Vec<PlaylistRef>, SourceError> {
        Ok(self
            .load()?
            .playlists
            .into_iter()
            .map(|p| PlaylistRef {
                id: p.id,
                title: p.title,
            })
            .collect())
    }

    fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<RawTrack>, SourceError> {
        Ok(self.load()?.playlist(playlist_id)?.tracks.clone())
    }

    fn history(&self) -> Result<Vec<RawTrack>, SourceError> {
        Ok(self.load()?.history)
    }

    fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, SourceError> {
        Ok(self
            .load()?
            .playlist(playlist_id)?
            .tracks
            .iter()
            .filter_map(as_item)
            .collect())
    }

    fn remove_items(&self, playlist_id: &str, items: &[PlaylistItem]) -> Result<(), SourceError> {
        let mut snapshot = self.load()?;
        let playlist = snapshot.playlist_mut(playlist_id)?;
        let before = playlist.tracks.len();

        for item in items {
            let position = playlist.tracks.iter().position(|track| match &item.set_video_id {
                Some(set_id) => set_video_id(track).as_deref() == Some(set_id.as_str()),
                None => track.video_id.as_deref() == Some(item.video_id.as_str()),
            });
            if let Some(position) = position {
                playlist.tracks.remove(position);
            }
        }

        debug!(
            "Removed {} of {} requested items from {playlist_id}",
            before - playlist.tracks.len(),
            items.len()
        );
        self.save(&snapshot)
    }

    fn add_items(&self, playlist_id: &str, ids: &[String]) -> Result<(), SourceError> {
        let mut snapshot = self.load()?;
        let additions: Vec<RawTrack> = ids
            .iter()
            .enumerate()
            .map(|(n, id)| {
                let mut track = snapshot.known_track(id).cloned().unwrap_or_else(|| RawTrack {
                    video_id: Some(id.clone()),
                    ..RawTrack::default()
                });
                track.extra.insert(
                    SET_VIDEO_ID.to_string(),
                    Value::String(format!("{playlist_id}:{id}:{n}")),
                );
                track
            })
            .collect();

        snapshot.playlist_mut(playlist_id)?.tracks.extend(additions);
        debug!("Added {} items to {playlist_id}", ids.len());
        self.save(&snapshot)
    }

    fn create_playlist(&self, name: &str, description: &str) -> Result<String, SourceError> {
        let mut snapshot = match self.load() {
            Ok(snapshot) => snapshot,
            // A fresh data directory has no export yet; start one.
            Err(SourceError::Unavailable { .. }) if !self.path.exists() => LibrarySnapshot::default(),
            Err(err) => return Err(err),
        };

        let mut n = snapshot.playlists.len() + 1;
        let id = loop {
            let candidate = format!("PLreplaymix{n:04}");
            if snapshot.playlists.iter().all(|p| p.id != candidate) {
                break candidate;
            }
            n += 1;
        };

        snapshot.playlists.push(SnapshotPlaylist {
            id: id.clone(),
            title: name.to_string(),
            description: description.to_string(),
            tracks: Vec::new(),
        });
        self.save(&snapshot)?;
        info!("Created playlist \"{name}\" ({id})");
        Ok(id)
    }
}
